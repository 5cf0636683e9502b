//! Persistent multi-stage build cache.
//!
//! Every pipeline stage reads and writes through here, keyed by
//! structured strings and gated by the source file's modification
//! time. A miss or a stale entry is never an error; it is the normal
//! trigger for recomputation. Entries survive across process runs via
//! bincode files on disk, fronted by an in-memory write-through map.

mod error;
mod key;
mod store;

pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use store::Cache;

/// Cache format version; bump when the entry layout changes. Entries
/// written by another version degrade to a miss.
pub const CACHE_VERSION: u32 = 1;

/// Default cache directory name.
pub const CACHE_DIR_NAME: &str = ".facet-cache";

/// Subdirectory holding one file per cache entry.
pub const ENTRIES_DIR_NAME: &str = "entries";

/// File recording the config fingerprint the cache was written under.
pub const FINGERPRINT_FILE_NAME: &str = "fingerprint";
