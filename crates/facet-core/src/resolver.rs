use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

use crate::class_record::ClassRecord;
use crate::deps::ClassMap;
use crate::errors::{BuildError, Result};
use crate::permutation::Permutation;

/// Transitive dependency resolver for one permutation: entry classes
/// in, the closed set of required classes out.
pub struct Resolver<'a> {
    known: &'a ClassMap,
    permutation: Option<&'a Permutation>,
    included: IndexMap<String, Arc<ClassRecord>>,
}

impl<'a> Resolver<'a> {
    pub fn new(known: &'a ClassMap, permutation: Option<&'a Permutation>) -> Self {
        Self {
            known,
            permutation,
            included: IndexMap::new(),
        }
    }

    /// Adds an entry class and everything it transitively requires.
    /// An unknown entry name is fatal.
    pub fn add_class_name(&mut self, name: &str) -> Result<()> {
        let record = self
            .known
            .get(name)
            .ok_or_else(|| BuildError::UnknownEntry(name.to_string()))?;

        let mut queue: Vec<Arc<ClassRecord>> = vec![record.clone()];
        while let Some(record) = queue.pop() {
            if self.included.contains_key(record.name()) {
                continue;
            }
            debug!(class = %record.name(), "including");
            self.included
                .insert(record.name().to_string(), record.clone());

            let deps = record.dependencies(self.permutation)?;
            for dep in deps.filter(self.known).iter() {
                if !self.included.contains_key(dep.name()) {
                    queue.push(dep.clone());
                }
            }
        }
        Ok(())
    }

    /// Included classes in discovery order.
    pub fn included_classes(&self) -> Vec<Arc<ClassRecord>> {
        self.included.values().cloned().collect()
    }
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
    fn test_transitive_closure() {
        let dir = TempDir::new().unwrap();
        let known = ClassMap::from_records([
            record(dir.path(), "app.Main", "app.Main = function() { app.Util.run(); };"),
            record(dir.path(), "app.Util", "app.Util = function() { app.Base.init(); };"),
            record(dir.path(), "app.Base", "app.Base = function() {};"),
            record(dir.path(), "app.Unused", "app.Unused = function() {};"),
        ])
        .unwrap();

        let mut resolver = Resolver::new(&known, None);
        resolver.add_class_name("app.Main").unwrap();
        let included = resolver.included_classes();

        let names: Vec<&str> = included.iter().map(|c| c.name()).collect();
        assert!(names.contains(&"app.Main"));
        assert!(names.contains(&"app.Util"));
        assert!(names.contains(&"app.Base"));
        assert!(!names.contains(&"app.Unused"));
    }

    #[test]
    fn test_unknown_entry_is_fatal() {
        let known = ClassMap::default();
        let mut resolver = Resolver::new(&known, None);
        let err = resolver.add_class_name("no.Such").unwrap_err();
        assert!(matches!(err, BuildError::UnknownEntry(name) if name == "no.Such"));
    }

    #[test]
    fn test_reference_cycles_terminate() {
        let dir = TempDir::new().unwrap();
        let known = ClassMap::from_records([
            record(dir.path(), "a.One", "a.One = function() { a.Two.go(); };"),
            record(dir.path(), "a.Two", "a.Two = function() { a.One.go(); };"),
        ])
        .unwrap();

        let mut resolver = Resolver::new(&known, None);
        resolver.add_class_name("a.One").unwrap();
        assert_eq!(resolver.included_classes().len(), 2);
    }
}
