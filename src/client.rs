//! Client Roles
//!
//! Two independent clients sharing one store. They never talk to each
//! other; they agree only through the bytes and flags they persist.
//!
//! - [`TypedClient`] stores application values and picks the flags itself.
//! - [`ByteClient`] stores byte buffers under flags chosen by its caller and
//!   hands back `(bytes, flags)` untouched. Interpreting the flags is the
//!   caller's job ([`ByteClient::get_decoded`] does it on request).

use bytes::Bytes;

use crate::codec::{Codec, Flag, Value};
use crate::error::{FlagKvError, Result};
use crate::store::{Store, StoredItem};

/// Client that reads and writes typed values
pub struct TypedClient<S: Store> {
    store: S,
    codec: Codec,
}

impl<S: Store> TypedClient<S> {
    pub fn new(store: S, codec: Codec) -> Self {
        Self { store, codec }
    }

    /// Encode `value` and store it under the flag matching its type
    pub fn set(&self, key: &str, value: &Value) -> Result<()> {
        let encoded = self.codec.encode(value);
        tracing::trace!("typed set {} as {}", key, encoded.flag);
        self.store.set(key, &encoded.bytes, encoded.flags())
    }

    /// Fetch `key` and decode it by its stored flags
    pub fn get(&self, key: &str) -> Result<Value> {
        let item = self.store.get(key)?;
        Ok(item.decode(&self.codec)?)
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Close the underlying store handle
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}

/// Client that reads and writes byte buffers
pub struct ByteClient<S: Store> {
    store: S,
    codec: Codec,
}

impl<S: Store> ByteClient<S> {
    pub fn new(store: S, codec: Codec) -> Self {
        Self { store, codec }
    }

    /// Store caller-prepared bytes under a caller-chosen flag
    pub fn set(&self, key: &str, bytes: impl Into<Bytes>, flag: Flag) -> Result<()> {
        let bytes = bytes.into();
        tracing::trace!("byte set {} ({} bytes) as {}", key, bytes.len(), flag);
        self.store.set(key, &bytes, flag.bits())
    }

    /// Prepare a value's bytes the way a byte-buffer caller would, then store
    /// them under the flag for the value's type
    ///
    /// Independent of [`Codec::encode`]: JSON is written by
    /// `serde_json::to_vec`, numbers by their `Display` text (plain decimal,
    /// never exponent form) and binary straight through the transport.
    pub fn set_value(&self, key: &str, value: &Value) -> Result<()> {
        let (bytes, flag) = match value {
            Value::Raw(s) => (Bytes::copy_from_slice(s.as_bytes()), Flag::Raw),
            Value::Json(doc) => {
                let bytes = serde_json::to_vec(doc)
                    .map_err(|e| FlagKvError::InvalidValue(format!("unserializable JSON: {}", e)))?;
                (Bytes::from(bytes), Flag::Json)
            }
            Value::Numeric(n) => (Bytes::from(n.to_string()), Flag::Numeric),
            Value::Binary(data) => (
                Bytes::from(self.codec.binary_transport().to_wire(data)),
                Flag::Binary,
            ),
        };
        self.set(key, bytes, flag)
    }

    /// Fetch `key` without interpreting its flags
    pub fn get(&self, key: &str) -> Result<StoredItem> {
        self.store.get(key)
    }

    /// Fetch `key` and apply the flag rules to its bytes
    pub fn get_decoded(&self, key: &str) -> Result<Value> {
        let item = self.get(key)?;
        Ok(item.decode(&self.codec)?)
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Close the underlying store handle
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}
