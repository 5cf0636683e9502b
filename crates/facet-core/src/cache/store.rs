use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Result, CACHE_VERSION, ENTRIES_DIR_NAME, FINGERPRINT_FILE_NAME};

/// On-disk shape of one entry: format version, freshness timestamp,
/// bincode payload of the stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    version: u32,
    timestamp: u64,
    payload: Vec<u8>,
}

/// Durable key/timestamp-gated memoization store.
///
/// Reads are fail-safe: a missing, corrupt, version-mismatched, or
/// stale entry degrades to a miss with at most a log line. Writes go
/// through to disk immediately and populate the in-memory map, so a
/// repeated read never touches the filesystem twice. The memory map
/// sits behind an `RwLock` so per-key read-check-then-write stays
/// sound if permutation processing is ever parallelized; execution
/// today is strictly sequential.
#[derive(Debug)]
pub struct Cache {
    entries_dir: Option<PathBuf>,
    memory: RwLock<FxHashMap<String, StoredEntry>>,
}

impl Cache {
    /// Opens (or creates) a durable cache under `dir`.
    ///
    /// The fingerprint is a hash of the build configuration; when it
    /// differs from the recorded one, every entry is discarded before
    /// the cache is handed out.
    pub fn open(dir: &Path, fingerprint: &str) -> Result<Self> {
        let entries_dir = dir.join(ENTRIES_DIR_NAME);
        let fingerprint_path = dir.join(FINGERPRINT_FILE_NAME);

        std::fs::create_dir_all(&entries_dir)?;

        let recorded = std::fs::read_to_string(&fingerprint_path).ok();
        if recorded.as_deref() != Some(fingerprint) {
            if recorded.is_some() {
                info!("config fingerprint changed, clearing cache");
            }
            std::fs::remove_dir_all(&entries_dir)?;
            std::fs::create_dir_all(&entries_dir)?;
            std::fs::write(&fingerprint_path, fingerprint)?;
        }

        Ok(Self {
            entries_dir: Some(entries_dir),
            memory: RwLock::new(FxHashMap::default()),
        })
    }

    /// Memory-only cache; used when caching is disabled. Entries still
    /// memoize within the session but nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            entries_dir: None,
            memory: RwLock::new(FxHashMap::default()),
        }
    }

    /// Reads an entry regardless of its timestamp.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_entry(key).and_then(|entry| decode(key, &entry))
    }

    /// Reads an entry, treating anything stored before `newer_than` as
    /// a miss.
    pub fn read_fresh<T: DeserializeOwned>(&self, key: &str, newer_than: u64) -> Option<T> {
        let entry = self.read_entry(key)?;
        if entry.timestamp < newer_than {
            debug!(key, "cache entry is stale");
            return None;
        }
        decode(key, &entry)
    }

    /// Stores a value under `key`, overwriting any prior entry.
    pub fn store<T: Serialize>(&self, key: &str, value: &T, timestamp: u64) -> Result<()> {
        let entry = StoredEntry {
            version: CACHE_VERSION,
            timestamp,
            payload: bincode::serialize(value)?,
        };

        if let Some(entries_dir) = &self.entries_dir {
            std::fs::write(self.entry_path(entries_dir, key), bincode::serialize(&entry)?)?;
        }

        self.memory
            .write()
            .expect("cache lock poisoned")
            .insert(key.to_string(), entry);
        Ok(())
    }

    /// Drops every entry, in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        self.memory.write().expect("cache lock poisoned").clear();
        if let Some(entries_dir) = &self.entries_dir {
            std::fs::remove_dir_all(entries_dir)?;
            std::fs::create_dir_all(entries_dir)?;
        }
        info!("cache cleared");
        Ok(())
    }

    pub fn is_durable(&self) -> bool {
        self.entries_dir.is_some()
    }

    fn entry_path(&self, entries_dir: &Path, key: &str) -> PathBuf {
        // Keys contain brackets and separators; the file name is the
        // key's blake3 hex instead.
        entries_dir.join(format!("{}.bin", blake3::hash(key.as_bytes()).to_hex()))
    }

    fn read_entry(&self, key: &str) -> Option<StoredEntry> {
        if let Some(entry) = self
            .memory
            .read()
            .expect("cache lock poisoned")
            .get(key)
            .cloned()
        {
            return Some(entry);
        }

        let entries_dir = self.entries_dir.as_ref()?;
        let path = self.entry_path(entries_dir, key);
        let bytes = std::fs::read(&path).ok()?;

        let entry: StoredEntry = match bincode::deserialize(&bytes) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, ?path, "corrupt cache entry, treating as miss: {}", err);
                return None;
            }
        };
        if entry.version != CACHE_VERSION {
            warn!(
                key,
                expected = CACHE_VERSION,
                found = entry.version,
                "cache version mismatch, treating as miss"
            );
            return None;
        }

        self.memory
            .write()
            .expect("cache lock poisoned")
            .insert(key.to_string(), entry.clone());
        Some(entry)
    }
}

fn decode<T: DeserializeOwned>(key: &str, entry: &StoredEntry) -> Option<T> {
    match bincode::deserialize(&entry.payload) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, "undecodable cache payload, treating as miss: {}", err);
            None
        }
    }
}
