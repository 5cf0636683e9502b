use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use walkdir::WalkDir;

use crate::bundle;
use crate::cache::Cache;
use crate::class_record::ClassRecord;
use crate::config::StrictLevel;
use crate::deps::ClassMap;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::{BuildError, Result};
use crate::ident::IdRegistry;
use crate::optimizer::OptimizationSet;
use crate::permutation::{Permutation, VariantValue};
use crate::resolver::Resolver;
use crate::sorter;

/// Outcome of building one permutation. Failures are isolated: one
/// failing permutation never aborts its siblings, and the session
/// reports every outcome.
pub struct PermutationOutcome {
    pub permutation: Permutation,
    pub result: Result<PathBuf>,
}

/// One build session: owns the cache handle, the diagnostic handler,
/// the identifier registry, the discovered classes, and the variant
/// axes. All session state is dropped with the session, whatever path
/// exits it, so nothing leaks into the next run.
pub struct Session {
    cache: Arc<Cache>,
    handler: Arc<dyn DiagnosticHandler>,
    registry: Mutex<IdRegistry>,
    classes: IndexMap<String, Arc<ClassRecord>>,
    variants: IndexMap<String, Vec<VariantValue>>,
    locales: Vec<String>,
    id_collision: StrictLevel,
    copyright: String,
}

impl Session {
    pub fn new(cache: Arc<Cache>, handler: Arc<dyn DiagnosticHandler>) -> Self {
        Self {
            cache,
            handler,
            registry: Mutex::new(IdRegistry::new()),
            classes: IndexMap::new(),
            variants: IndexMap::new(),
            locales: Vec::new(),
            id_collision: StrictLevel::default(),
            copyright: "Copyright 2026 the Facet project".to_string(),
        }
    }

    pub fn set_id_collision(&mut self, level: StrictLevel) {
        self.id_collision = level;
    }

    pub fn set_copyright(&mut self, copyright: impl Into<String>) {
        self.copyright = copyright.into();
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Scans `<root>/src/**/*.js` into class records. The logical name
    /// is the path relative to the source root with separators turned
    /// into dots and the extension stripped.
    pub fn add_project(&mut self, root: &Path) -> Result<usize> {
        let src = root.join("src");
        let mut added = 0usize;

        for entry in WalkDir::new(&src).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                BuildError::Config(format!("cannot scan {}: {}", src.display(), err))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("js") {
                continue;
            }

            let rel = path
                .strip_prefix(&src)
                .expect("walked path is under the source root");
            let name = logical_name(rel);

            if let Some(existing) = self.classes.get(&name) {
                return Err(BuildError::DuplicateClass {
                    name,
                    first: existing.path().to_path_buf(),
                    second: path.to_path_buf(),
                });
            }

            let mut registry = self.registry.lock().expect("registry lock poisoned");
            let record = ClassRecord::new(
                &name,
                path,
                Arc::clone(&self.cache),
                &mut registry,
                self.handler.as_ref(),
                self.id_collision,
            )?;
            drop(registry);

            self.classes.insert(name, Arc::new(record));
            added += 1;
        }

        info!(project = %root.display(), classes = added, "added project");
        Ok(added)
    }

    /// Adds one variant axis. Axis definition order fixes permutation
    /// enumeration order.
    pub fn add_variant(&mut self, name: impl Into<String>, values: Vec<VariantValue>) {
        self.variants.insert(name.into(), values);
    }

    pub fn add_locale(&mut self, locale: impl Into<String>) {
        self.locales.push(locale.into());
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassRecord>> {
        self.classes.values()
    }

    pub fn class_map(&self) -> Result<ClassMap> {
        ClassMap::from_records(self.classes.values().cloned())
    }

    /// Cartesian product of the variant axes, axes in definition
    /// order. With no variants there is exactly one empty permutation.
    pub fn permutations(&self) -> Vec<Permutation> {
        let mut permutations = vec![Permutation::new()];
        for (name, values) in &self.variants {
            let mut next = Vec::with_capacity(permutations.len() * values.len());
            for permutation in &permutations {
                for value in values {
                    let mut extended = permutation.clone();
                    extended.set(name.clone(), value.clone());
                    next.push(extended);
                }
            }
            permutations = next;
        }
        permutations
    }

    /// Builds every permutation sequentially, collecting one outcome
    /// per permutation. The exit decision is the caller's; a failure
    /// here only skips the permutation it belongs to.
    pub fn build(
        &self,
        entries: &[String],
        optimizations: &OptimizationSet,
        output_dir: &Path,
        output_file: Option<&str>,
    ) -> Vec<PermutationOutcome> {
        let permutations = self.permutations();
        let patch_names = output_file.is_some() && permutations.len() > 1;

        permutations
            .into_iter()
            .map(|permutation| {
                info!(permutation = %permutation, "building");
                let result =
                    self.build_permutation(&permutation, entries, optimizations)
                        .and_then(|code| {
                            let filename = match output_file {
                                Some(name) if patch_names => permutation.patch_filename(name),
                                Some(name) => name.to_string(),
                                None => format!("build-{}.js", permutation.checksum()),
                            };
                            let path = output_dir.join(filename);
                            std::fs::write(&path, &code)?;
                            info!(output = %path.display(), bytes = code.len(), "wrote bundle");
                            Ok(path)
                        });
                if let Err(err) = &result {
                    error!(permutation = %permutation, "permutation failed: {}", err);
                    self.handler.error(None, &err.to_string());
                }
                PermutationOutcome { permutation, result }
            })
            .collect()
    }

    /// Resolves, sorts, and serializes one permutation into its bundle
    /// text.
    pub fn build_permutation(
        &self,
        permutation: &Permutation,
        entries: &[String],
        optimizations: &OptimizationSet,
    ) -> Result<String> {
        let entry = entries
            .first()
            .ok_or_else(|| BuildError::Config("no entry class configured".to_string()))?;

        let known = self.class_map()?;
        let perm = if permutation.is_empty() {
            None
        } else {
            Some(permutation)
        };

        let mut resolver = Resolver::new(&known, perm);
        for name in entries {
            resolver.add_class_name(name)?;
        }
        let included = resolver.included_classes();
        info!(classes = included.len(), "resolved dependency closure");

        let sorted = sorter::sort(&included, perm, &known)?;
        bundle::assemble(
            &self.copyright,
            permutation,
            optimizations,
            &self.locales,
            &sorted,
            entry,
        )
    }
}

impl Drop for Session {
    /// Session close is modeled on `Drop` so it runs on every exit
    /// path, error and panic included.
    fn drop(&mut self) {
        info!(classes = self.classes.len(), "closing build session");
    }
}

fn logical_name(rel: &Path) -> String {
    let stem = rel.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(".")
}
