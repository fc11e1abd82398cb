//! Store Module
//!
//! The key-value capability the codec's bytes are written to and read from.
//!
//! ## Contract
//! - `set` replaces the whole `(bytes, flags)` pair of a key
//! - `get` returns exactly what the last completed `set` stored, or
//!   [`FlagKvError::KeyNotFound`](crate::FlagKvError::KeyNotFound)
//! - No retries, pooling or conflict resolution; the last writer wins
//!
//! Handles are passed explicitly to every caller; there is no process-wide
//! connection.

mod memory;
mod memcached;

use std::sync::Arc;

use bytes::Bytes;

use crate::codec::{Codec, Flag, Value};
use crate::error::{DecodeError, Result};

pub use memory::MemoryStore;
pub use memcached::MemcachedStore;

/// An item as read back from a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub key: String,
    pub bytes: Bytes,
    pub flags: u32,
}

impl StoredItem {
    /// The known flag, or `None` for flags this codec does not define
    pub fn flag(&self) -> Option<Flag> {
        Flag::from_bits(self.flags)
    }

    /// Apply the codec's decode rules to this item
    pub fn decode(&self, codec: &Codec) -> std::result::Result<Value, DecodeError> {
        codec.decode(&self.bytes, self.flags)
    }
}

/// Key-value persistence capability
pub trait Store: Send + Sync {
    /// Store `bytes` under `key` with the given flags word
    fn set(&self, key: &str, bytes: &[u8], flags: u32) -> Result<()>;

    /// Fetch the bytes and flags last stored under `key`
    fn get(&self, key: &str) -> Result<StoredItem>;

    /// Release the handle; further calls may fail
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn set(&self, key: &str, bytes: &[u8], flags: u32) -> Result<()> {
        (**self).set(key, bytes, flags)
    }

    fn get(&self, key: &str) -> Result<StoredItem> {
        (**self).get(key)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl<S: Store + ?Sized> Store for &S {
    fn set(&self, key: &str, bytes: &[u8], flags: u32) -> Result<()> {
        (**self).set(key, bytes, flags)
    }

    fn get(&self, key: &str) -> Result<StoredItem> {
        (**self).get(key)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
