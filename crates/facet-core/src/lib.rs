//! Facet core: a permutation-aware incremental JavaScript build
//! pipeline.
//!
//! The build compiles a set of source classes into one optimized
//! bundle per permutation of build-time variant fields. The core here
//! is the incremental engine: deterministic per-class identifiers, the
//! multi-stage cached transform chain (parse, permutation-specialize,
//! optimize, serialize), and the dependency resolver that maps raw
//! symbol and package references to the set of required classes.

pub mod ast;
pub mod bundle;
pub mod cache;
pub mod class_record;
pub mod config;
pub mod deps;
pub mod diagnostics;
pub mod errors;
pub mod ident;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod permutation;
pub mod resolve;
pub mod resolver;
pub mod serializer;
pub mod session;
pub mod sorter;
pub mod specialize;

pub use cache::{Cache, CacheKey};
pub use class_record::ClassRecord;
pub use config::{BuildConfig, BuilderOptions, StrictLevel};
pub use deps::{BreakDependencySet, ClassMap, DependencySet, FilteredDependencySet};
pub use diagnostics::{
    CollectingDiagnosticHandler, ConsoleDiagnosticHandler, Diagnostic, DiagnosticHandler,
    DiagnosticLevel,
};
pub use errors::{BuildError, Result};
pub use ident::IdRegistry;
pub use optimizer::{OptimizationPass, OptimizationSet};
pub use permutation::{Permutation, VariantValue};
pub use resolver::Resolver;
pub use session::{PermutationOutcome, Session};
