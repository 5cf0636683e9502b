use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ast::SyntaxTree;
use crate::class_record::ClassRecord;
use crate::errors::{BuildError, Result};

/// Raw reference names collected from one class's tree. A clean data
/// value with no links into other systems, which is what keeps it
/// cacheable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencySet {
    pub owner: String,
    pub shared: IndexSet<String>,
    pub packages: IndexSet<String>,
}

/// Load-time references: classes that must load strictly before the
/// owner, not merely be present in the bundle. Cached under its own
/// key as a side output of extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakDependencySet {
    pub owner: String,
    pub shared: IndexSet<String>,
    pub packages: IndexSet<String>,
}

impl DependencySet {
    /// Packages a tree's reference statistics into the general and
    /// break dependency sets.
    pub fn collect(tree: &SyntaxTree, owner: &str) -> (DependencySet, BreakDependencySet) {
        let stats = tree.stats();
        let deps = DependencySet {
            owner: owner.to_string(),
            shared: stats.shared.clone(),
            packages: stats.packages.clone(),
        };
        let breaks = BreakDependencySet {
            owner: owner.to_string(),
            shared: stats.loadtime_shared.clone(),
            packages: stats.loadtime_packages.clone(),
        };
        (deps, breaks)
    }

    /// Resolves the raw names against the known classes.
    pub fn filter(&self, known: &ClassMap) -> FilteredDependencySet {
        filter_refs(&self.owner, &self.shared, &self.packages, known)
    }
}

impl BreakDependencySet {
    pub fn filter(&self, known: &ClassMap) -> FilteredDependencySet {
        filter_refs(&self.owner, &self.shared, &self.packages, known)
    }
}

/// Shared references resolve by exact lookup only. Package references
/// walk up the dot hierarchy until a known class or the owner is hit,
/// so the most specific known package wins. The owner itself is never
/// included from either kind.
fn filter_refs(
    owner: &str,
    shared: &IndexSet<String>,
    packages: &IndexSet<String>,
    known: &ClassMap,
) -> FilteredDependencySet {
    let mut result = FilteredDependencySet::default();

    for name in shared {
        if name != owner {
            if let Some(record) = known.get(name) {
                result.insert(record.clone());
            }
        }
    }

    for package in packages {
        let mut current = package.as_str();
        loop {
            if current == owner {
                break;
            }
            if let Some(record) = known.get(current) {
                result.insert(record.clone());
                break;
            }
            match current.rfind('.') {
                Some(pos) => current = &current[..pos],
                None => break,
            }
        }
    }

    result
}

/// Resolved dependencies: class records keyed by logical name, in
/// resolution order. Duplicate resolutions collapse.
#[derive(Debug, Clone, Default)]
pub struct FilteredDependencySet {
    classes: IndexMap<String, Arc<ClassRecord>>,
}

impl FilteredDependencySet {
    pub fn insert(&mut self, record: Arc<ClassRecord>) {
        self.classes.entry(record.name().to_string()).or_insert(record);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClassRecord>> {
        self.classes.values()
    }
}

/// The known-classes mapping from logical name to class record.
///
/// Construction rejects two records claiming one logical name with a
/// fatal usage error; anything else about the mapping contract is
/// enforced by the type itself.
#[derive(Debug, Clone, Default)]
pub struct ClassMap {
    classes: IndexMap<String, Arc<ClassRecord>>,
}

impl ClassMap {
    pub fn from_records(records: impl IntoIterator<Item = Arc<ClassRecord>>) -> Result<Self> {
        let mut classes: IndexMap<String, Arc<ClassRecord>> = IndexMap::new();
        for record in records {
            if let Some(existing) = classes.get(record.name()) {
                return Err(BuildError::DuplicateClass {
                    name: record.name().to_string(),
                    first: existing.path().to_path_buf(),
                    second: record.path().to_path_buf(),
                });
            }
            classes.insert(record.name().to_string(), record);
        }
        Ok(Self { classes })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ClassRecord>> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClassRecord>> {
        self.classes.values()
    }
}
