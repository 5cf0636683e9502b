use std::sync::Arc;

use crate::class_record::ClassRecord;
use crate::errors::Result;
use crate::optimizer::OptimizationSet;
use crate::permutation::Permutation;

/// Assembles the final bundle text for one permutation: generated
/// header, exported locale data, the serialized classes in sorted
/// order, and the fixed boot call for the entry class.
pub fn assemble(
    copyright: &str,
    permutation: &Permutation,
    optimizations: &OptimizationSet,
    locales: &[String],
    sorted_classes: &[Arc<ClassRecord>],
    entry: &str,
) -> Result<String> {
    let mut out = String::new();

    out.push_str("/*\n");
    out.push_str(&format!(" * {}\n", copyright));
    out.push_str(" *\n");
    out.push_str(&format!(" * Permutation: {}\n", permutation));
    out.push_str(&format!(" * Optimizations: {}\n", optimizations));
    out.push_str(" */\n\n");

    if !locales.is_empty() {
        let quoted: Vec<String> = locales.iter().map(|l| format!("\"{}\"", l)).collect();
        out.push_str(&format!("facet.LOCALES = [{}];\n", quoted.join(",")));
    }

    for class in sorted_classes {
        let permutation = if permutation.is_empty() {
            None
        } else {
            Some(permutation)
        };
        out.push_str(&class.compressed(permutation, optimizations)?);
        out.push('\n');
    }

    out.push_str(&format!("new {}().boot();", entry));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::config::StrictLevel;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::ident::IdRegistry;
    use crate::permutation::VariantValue;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_bundle_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Application.js");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"main.Application = function() { this.ready = true; };")
            .unwrap();

        let cache = Arc::new(Cache::in_memory());
        let mut registry = IdRegistry::new();
        let handler = CollectingDiagnosticHandler::new();
        let record = Arc::new(
            ClassRecord::new(
                "main.Application",
                &path,
                cache,
                &mut registry,
                &handler,
                StrictLevel::Warning,
            )
            .unwrap(),
        );

        let mut perm = Permutation::new();
        perm.set("debug", VariantValue::Str("on".into()));
        let opts = OptimizationSet::parse(["unused", "blocks"]).unwrap();

        let bundle = assemble(
            "Copyright 2026 the Facet project",
            &perm,
            &opts,
            &["en_US".to_string()],
            &[record],
            "main.Application",
        )
        .unwrap();

        assert!(bundle.starts_with("/*\n * Copyright 2026 the Facet project\n"));
        assert!(bundle.contains(" * Permutation: debug:on\n"));
        assert!(bundle.contains(" * Optimizations: blocks, unused\n"));
        assert!(bundle.contains("facet.LOCALES = [\"en_US\"];\n"));
        assert!(bundle.contains("main.Application=function(){this.ready=true;};"));
        assert!(bundle.ends_with("new main.Application().boot();"));
    }
}
