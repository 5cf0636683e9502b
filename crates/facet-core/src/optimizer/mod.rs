//! Post-specialization optimization passes.
//!
//! Passes are an enumerated type and run through a statically ordered
//! pipeline filtered by membership in the requested set, so the order
//! the caller names them in can never change the output: private
//! encryption must see un-renamed scopes, and block reduction must run
//! before declaration combination so combinable declarations surface.

mod blocks;
mod declarations;
mod privates;
mod variables;

use std::collections::BTreeSet;
use std::fmt;

use crate::ast::SyntaxTree;
use crate::errors::{BuildError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptimizationPass {
    /// Dead-code removal; does its work in the permutation sweep and
    /// has no tree pass of its own.
    Unused,
    /// Private member encryption, keyed by the class identifier.
    Privates,
    /// Local variable renaming.
    Variables,
    /// Block flattening and empty-statement removal.
    Blocks,
    /// Merging of adjacent `var` declarations.
    Declarations,
    /// Reserved for string optimization; currently a no-op.
    Strings,
}

impl OptimizationPass {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationPass::Unused => "unused",
            OptimizationPass::Privates => "privates",
            OptimizationPass::Variables => "variables",
            OptimizationPass::Blocks => "blocks",
            OptimizationPass::Declarations => "declarations",
            OptimizationPass::Strings => "x-strings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unused" => Some(OptimizationPass::Unused),
            "privates" => Some(OptimizationPass::Privates),
            "variables" => Some(OptimizationPass::Variables),
            "blocks" => Some(OptimizationPass::Blocks),
            "declarations" => Some(OptimizationPass::Declarations),
            "x-strings" => Some(OptimizationPass::Strings),
            _ => None,
        }
    }
}

/// Tree passes in their mandatory execution order. `Unused` has no
/// slot here; it participates in signatures only.
const PIPELINE: [OptimizationPass; 5] = [
    OptimizationPass::Privates,
    OptimizationPass::Variables,
    OptimizationPass::Blocks,
    OptimizationPass::Declarations,
    OptimizationPass::Strings,
];

/// Canonicalized set of requested passes. Membership, not request
/// order, is what reaches the pipeline and the cache signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizationSet {
    passes: BTreeSet<OptimizationPass>,
}

impl OptimizationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_passes(passes: impl IntoIterator<Item = OptimizationPass>) -> Self {
        Self {
            passes: passes.into_iter().collect(),
        }
    }

    /// Parses pass names from config or CLI; an unknown name is a
    /// config error.
    pub fn parse<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut passes = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            let pass = OptimizationPass::from_name(name)
                .ok_or_else(|| BuildError::UnknownOptimization(name.to_string()))?;
            passes.insert(pass);
        }
        Ok(Self { passes })
    }

    pub fn contains(&self, pass: OptimizationPass) -> bool {
        self.passes.contains(&pass)
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Member names in sorted order; two sets with equal members
    /// always produce identical names.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.passes.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names
    }

    /// Cache-key component: sorted member names joined with `+`.
    pub fn signature(&self) -> String {
        self.names().join("+")
    }

    /// Runs the member passes over the tree in pipeline order.
    pub fn apply(&self, tree: &mut SyntaxTree, class_id: &str) {
        for pass in PIPELINE {
            if !self.contains(pass) {
                continue;
            }
            match pass {
                OptimizationPass::Privates => privates::optimize(tree, class_id),
                OptimizationPass::Variables => variables::optimize(tree),
                OptimizationPass::Blocks => blocks::optimize(tree),
                OptimizationPass::Declarations => declarations::optimize(tree),
                OptimizationPass::Strings => {}
                OptimizationPass::Unused => unreachable!("unused has no pipeline slot"),
            }
        }
    }
}

impl fmt::Display for OptimizationSet {
    /// Human-readable form for logs and bundle headers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(", "))
    }
}
