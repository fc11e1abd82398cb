//! In-memory store
//!
//! HashMap-based store with RwLock for concurrency. Backs the server and
//! serves as an in-process store for tests.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{FlagKvError, Result};
use crate::protocol::validate_key;
use super::{Store, StoredItem};

/// In-process key-value store
///
/// ## Concurrency:
/// - `entries`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - All methods use `&self`
pub struct MemoryStore {
    /// key → (bytes, flags)
    entries: RwLock<HashMap<String, (Bytes, u32)>>,

    /// Largest value accepted by `set`
    max_value_size: usize,
}

impl MemoryStore {
    /// Create an empty store with no practical value size limit
    pub fn new() -> Self {
        Self::with_max_value_size(usize::MAX)
    }

    /// Create an empty store that rejects values above `max_value_size`
    pub fn with_max_value_size(max_value_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_value_size,
        }
    }

    /// Store an item whose bytes are already shared
    ///
    /// Avoids a copy when the caller holds a `Bytes`, as the server does.
    pub fn insert(&self, key: &str, bytes: Bytes, flags: u32) -> Result<()> {
        validate_key(key)?;
        if bytes.len() > self.max_value_size {
            return Err(FlagKvError::ValueTooLarge {
                size: bytes.len(),
                max: self.max_value_size,
            });
        }

        self.entries.write().insert(key.to_string(), (bytes, flags));
        Ok(())
    }

    /// Fetch the shared bytes and flags of a key, if present
    pub fn get_shared(&self, key: &str) -> Option<(Bytes, u32)> {
        self.entries.read().get(key).cloned()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Total stored bytes, excluding keys
    pub fn size(&self) -> usize {
        self.entries.read().values().map(|(bytes, _)| bytes.len()).sum()
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn max_value_size(&self) -> usize {
        self.max_value_size
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn set(&self, key: &str, bytes: &[u8], flags: u32) -> Result<()> {
        self.insert(key, Bytes::copy_from_slice(bytes), flags)
    }

    fn get(&self, key: &str) -> Result<StoredItem> {
        let (bytes, flags) = self.get_shared(key).ok_or(FlagKvError::KeyNotFound)?;

        Ok(StoredItem {
            key: key.to_string(),
            bytes,
            flags,
        })
    }
}
