use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::class_record::ClassRecord;
use crate::deps::ClassMap;
use crate::errors::{BuildError, Result};
use crate::permutation::Permutation;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Orders the included classes so break dependencies load strictly
/// first; everything else keeps its inclusion order. A break cycle is
/// fatal and names the classes on the cycle.
pub fn sort(
    included: &[Arc<ClassRecord>],
    permutation: Option<&Permutation>,
    known: &ClassMap,
) -> Result<Vec<Arc<ClassRecord>>> {
    let mut marks: FxHashMap<String, Mark> = FxHashMap::default();
    let mut sorted: Vec<Arc<ClassRecord>> = Vec::with_capacity(included.len());
    let in_build: FxHashMap<&str, &Arc<ClassRecord>> = included
        .iter()
        .map(|record| (record.name(), record))
        .collect();

    for record in included {
        visit(
            record,
            permutation,
            known,
            &in_build,
            &mut marks,
            &mut Vec::new(),
            &mut sorted,
        )?;
    }
    Ok(sorted)
}

fn visit(
    record: &Arc<ClassRecord>,
    permutation: Option<&Permutation>,
    known: &ClassMap,
    in_build: &FxHashMap<&str, &Arc<ClassRecord>>,
    marks: &mut FxHashMap<String, Mark>,
    path: &mut Vec<String>,
    sorted: &mut Vec<Arc<ClassRecord>>,
) -> Result<()> {
    match marks.get(record.name()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let mut cycle = path.clone();
            cycle.push(record.name().to_string());
            return Err(BuildError::DependencyCycle(cycle.join(" -> ")));
        }
        None => {}
    }

    marks.insert(record.name().to_string(), Mark::Visiting);
    path.push(record.name().to_string());

    let breaks = record.break_dependencies(permutation)?;
    for dep in breaks.filter(known).iter() {
        // Break deps outside the included set have nothing to order.
        if let Some(dep) = in_build.get(dep.name()) {
            visit(dep, permutation, known, in_build, marks, path, sorted)?;
        }
    }

    path.pop();
    marks.insert(record.name().to_string(), Mark::Done);
    sorted.push(record.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::config::StrictLevel;
    use crate::diagnostics::CollectingDiagnosticHandler;
    use crate::ident::IdRegistry;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn record(dir: &Path, name: &str, source: &str) -> Arc<ClassRecord> {
        let cache = Arc::new(Cache::in_memory());
        let path = dir.join(format!("{}.js", name.replace('.', "_")));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(source.as_bytes()).unwrap();
        let mut registry = IdRegistry::new();
        let handler = CollectingDiagnosticHandler::new();
        Arc::new(
            ClassRecord::new(name, &path, cache, &mut registry, &handler, StrictLevel::Off)
                .unwrap(),
        )
    }

    #[test]
    fn test_break_dependency_loads_first() {
        let dir = TempDir::new().unwrap();
        // app.Main references app.Base at load time, so app.Base has
        // to come first even though app.Main was included first.
        let main = record(dir.path(), "app.Main", "app.Base.extend();");
        let base = record(dir.path(), "app.Base", "app.Base = function() {};");
        let known = ClassMap::from_records([main.clone(), base.clone()]).unwrap();

        let sorted = sort(&[main, base], None, &known).unwrap();
        let names: Vec<&str> = sorted.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["app.Base", "app.Main"]);
    }

    #[test]
    fn test_runtime_references_keep_inclusion_order() {
        let dir = TempDir::new().unwrap();
        let main = record(
            dir.path(),
            "app.Main",
            "app.Main = function() { app.Base.extend(); };",
        );
        let base = record(dir.path(), "app.Base", "app.Base = function() {};");
        let known = ClassMap::from_records([main.clone(), base.clone()]).unwrap();

        let sorted = sort(&[main, base], None, &known).unwrap();
        let names: Vec<&str> = sorted.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["app.Main", "app.Base"]);
    }

    #[test]
    fn test_break_cycle_is_fatal() {
        let dir = TempDir::new().unwrap();
        let one = record(dir.path(), "a.One", "a.Two.init();");
        let two = record(dir.path(), "a.Two", "a.One.init();");
        let known = ClassMap::from_records([one.clone(), two.clone()]).unwrap();

        let err = sort(&[one, two], None, &known).unwrap_err();
        match err {
            BuildError::DependencyCycle(cycle) => {
                assert!(cycle.contains("a.One"));
                assert!(cycle.contains("a.Two"));
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }
}
