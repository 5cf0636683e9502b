use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::debug;

use crate::ast::SyntaxTree;
use crate::cache::{Cache, CacheKey};
use crate::config::StrictLevel;
use crate::deps::{BreakDependencySet, DependencySet};
use crate::diagnostics::DiagnosticHandler;
use crate::errors::Result;
use crate::ident::{self, IdRegistry};
use crate::optimizer::OptimizationSet;
use crate::parser;
use crate::permutation::Permutation;
use crate::serializer;
use crate::specialize;

/// One source class: identity plus lazy, cache-backed accessors for
/// every pipeline stage. Created once per discovered file per session
/// and shared across all permutations; the source mtime is the
/// freshness token for every cached stage.
#[derive(Debug)]
pub struct ClassRecord {
    name: String,
    path: PathBuf,
    mtime: u64,
    id: String,
    cache: Arc<Cache>,
}

impl ClassRecord {
    /// Constructs the record and eagerly assigns its identifier,
    /// registering it for collision detection.
    pub fn new(
        name: &str,
        path: &Path,
        cache: Arc<Cache>,
        registry: &mut IdRegistry,
        handler: &dyn DiagnosticHandler,
        strictness: StrictLevel,
    ) -> Result<Self> {
        let mtime = read_mtime(path)?;
        let id = ident::assign(&cache, registry, name, mtime, handler, strictness)?;
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            mtime,
            id,
            cache,
        })
    }

    /// Logical dot-separated class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Short identifier; memoized at construction, so repeated access
    /// never re-reads the cache.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw source text.
    pub fn text(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    /// Base syntax tree, cached against the source mtime. Logically
    /// immutable once cached; every specialization clones it.
    pub fn tree(&self) -> Result<SyntaxTree> {
        let key = CacheKey::tree(&self.name);
        if let Some(tree) = self.cache.read_fresh::<SyntaxTree>(&key, self.mtime) {
            return Ok(tree);
        }
        debug!(class = %self.name, "parsing");
        let tree = parser::parse(&self.text()?, &self.name)?;
        self.cache.store(&key, &tree, self.mtime)?;
        Ok(tree)
    }

    /// Permutation- and optimization-specialized tree.
    ///
    /// Works on an independent copy of the base tree; this stage is
    /// not cached on its own, the serialized output is.
    pub fn specialized_tree(
        &self,
        permutation: Option<&Permutation>,
        optimizations: Option<&OptimizationSet>,
    ) -> Result<SyntaxTree> {
        let mut tree = self.tree()?;
        if let Some(permutation) = permutation {
            specialize::specialize(&mut tree, permutation);
        }
        if let Some(optimizations) = optimizations {
            optimizations.apply(&mut tree, &self.id);
        }
        Ok(tree)
    }

    /// Dependency set for one permutation. Break dependencies fall out
    /// of the same extraction and are stored under their own key.
    pub fn dependencies(&self, permutation: Option<&Permutation>) -> Result<DependencySet> {
        let key = CacheKey::deps(&self.name, permutation);
        if let Some(deps) = self.cache.read_fresh::<DependencySet>(&key, self.mtime) {
            return Ok(deps);
        }

        let tree = self.specialized_tree(permutation, None)?;
        let (deps, breaks) = DependencySet::collect(&tree, &self.name);
        self.cache.store(&key, &deps, self.mtime)?;
        self.cache.store(
            &CacheKey::breaks(&self.name, permutation),
            &breaks,
            self.mtime,
        )?;
        Ok(deps)
    }

    /// Break-dependency set for one permutation.
    pub fn break_dependencies(
        &self,
        permutation: Option<&Permutation>,
    ) -> Result<BreakDependencySet> {
        let key = CacheKey::breaks(&self.name, permutation);
        if let Some(breaks) = self.cache.read_fresh::<BreakDependencySet>(&key, self.mtime) {
            return Ok(breaks);
        }

        // This entry can degrade on its own while the deps entry stays
        // fresh, so recompute the extraction directly instead of going
        // through `dependencies`.
        let tree = self.specialized_tree(permutation, None)?;
        let (deps, breaks) = DependencySet::collect(&tree, &self.name);
        self.cache
            .store(&CacheKey::deps(&self.name, permutation), &deps, self.mtime)?;
        self.cache.store(&key, &breaks, self.mtime)?;
        Ok(breaks)
    }

    /// Serialized compact output for one permutation and optimization
    /// set, cached under both signatures.
    pub fn compressed(
        &self,
        permutation: Option<&Permutation>,
        optimizations: &OptimizationSet,
    ) -> Result<String> {
        let key = CacheKey::compressed(&self.name, permutation, optimizations);
        if let Some(compressed) = self.cache.read_fresh::<String>(&key, self.mtime) {
            return Ok(compressed);
        }

        let tree = self.specialized_tree(permutation, Some(optimizations))?;
        let compressed = serializer::compress(&tree);
        self.cache.store(&key, &compressed, self.mtime)?;
        Ok(compressed)
    }
}

impl PartialEq for ClassRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassRecord {}

impl std::hash::Hash for ClassRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for ClassRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn read_mtime(path: &Path) -> Result<u64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Ok(millis)
}
