use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;

/// Errors that abort a build session or a single permutation.
///
/// Cache misses and staleness are never errors; they are the normal
/// trigger for recomputation and never surface here.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("parse error in {class} (line {line}): {message}")]
    Parse {
        class: String,
        line: u32,
        message: String,
    },

    #[error("duplicate class name {name}: {first} and {second} both map to it")]
    DuplicateClass {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("unknown entry class: {0}")]
    UnknownEntry(String),

    #[error("load-time dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("unknown optimization: {0}")]
    UnknownOptimization(String),

    #[error("identifier collision: {first} and {second} both encode to {id}")]
    IdCollision {
        id: String,
        first: String,
        second: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BuildError>;
