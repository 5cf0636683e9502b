use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cache::{Cache, CacheKey};
use crate::config::StrictLevel;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::{BuildError, Result};

/// Lowercase, uppercase, digits; index order defines digit values.
const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const CRC32_POLY: u32 = 0xEDB8_8320;

/// CRC-32 (IEEE, reflected) over `data`, as zlib computes it.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (CRC32_POLY & mask);
        }
    }
    !crc
}

/// Encodes a checksum in the 62-symbol alphabet, most significant
/// digit first; zero maps to the alphabet's first symbol.
pub fn encode_base62(mut value: u32) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }
    let mut digits = Vec::new();
    while value != 0 {
        digits.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();
    String::from_utf8(digits).expect("alphabet is ASCII")
}

/// Session-owned registry of identifier to logical name, used for
/// collision detection. Constructed at session start and dropped with
/// the session; never process-global, so sessions and tests cannot
/// leak identifiers into each other.
#[derive(Debug, Default)]
pub struct IdRegistry {
    ids: FxHashMap<String, String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Registers an identifier, surfacing a collision with a different
    /// logical name through the diagnostic handler. With strictness
    /// `error` the collision aborts; with `warning` the build proceeds
    /// with degraded output; `off` stays silent.
    fn register(
        &mut self,
        id: &str,
        name: &str,
        handler: &dyn DiagnosticHandler,
        strictness: StrictLevel,
    ) -> Result<()> {
        if let Some(existing) = self.ids.get(id) {
            if existing != name {
                let message = format!(
                    "identifier collision: {} and {} both encode to {}",
                    existing, name, id
                );
                match strictness {
                    StrictLevel::Error => {
                        handler.error(Some(name), &message);
                        return Err(BuildError::IdCollision {
                            id: id.to_string(),
                            first: existing.clone(),
                            second: name.to_string(),
                        });
                    }
                    StrictLevel::Warning => handler.warning(Some(name), &message),
                    StrictLevel::Off => {}
                }
            }
        }
        self.ids.insert(id.to_string(), name.to_string());
        Ok(())
    }
}

/// Assigns the short identifier for a logical class name.
///
/// The identifier is a pure function of the name, so the cache read
/// passes no freshness token; a hit from any earlier run is returned
/// as-is, which keeps identifiers stable across sessions.
pub fn assign(
    cache: &Cache,
    registry: &mut IdRegistry,
    name: &str,
    mtime: u64,
    handler: &dyn DiagnosticHandler,
    strictness: StrictLevel,
) -> Result<String> {
    let key = CacheKey::id(name);
    let id = match cache.read::<String>(&key) {
        Some(id) => id,
        None => {
            let id = encode_base62(crc32(name.as_bytes()));
            debug!(class = name, id, "assigned class identifier");
            cache.store(&key, &id, mtime)?;
            id
        }
    };
    registry.register(&id, name, handler, strictness)?;
    Ok(id)
}
