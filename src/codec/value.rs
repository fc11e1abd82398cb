//! Value definitions
//!
//! The logical values an application stores through the codec.

use std::fmt;
use std::fs;
use std::path::Path;

use bytes::Bytes;

use crate::error::{FlagKvError, Result};
use super::Flag;

/// A finite 64-bit float
///
/// NaN and the infinities have no portable decimal text form, so they are
/// rejected here rather than at encode time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Numeric(f64);

impl Numeric {
    /// Wrap a float, rejecting NaN and infinities
    pub fn new(n: f64) -> Result<Self> {
        if n.is_finite() {
            Ok(Self(n))
        } else {
            Err(FlagKvError::InvalidValue(format!(
                "numeric value must be finite, got {}",
                n
            )))
        }
    }

    /// `mantissa / 10^scale`, e.g. `from_decimal(425, 1)` is 42.5
    ///
    /// Always finite, so it cannot fail.
    pub fn from_decimal(mantissa: i32, scale: u8) -> Self {
        Self(f64::from(mantissa) / 10f64.powi(i32::from(scale)))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Numeric {
    type Error = FlagKvError;

    fn try_from(n: f64) -> Result<Self> {
        Self::new(n)
    }
}

impl From<i32> for Numeric {
    fn from(n: i32) -> Self {
        Self(f64::from(n))
    }
}

impl From<Numeric> for f64 {
    fn from(n: Numeric) -> Self {
        n.0
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value as the typed client sees it
///
/// Equality is semantic: JSON objects compare without regard to key order,
/// numbers by numeric value, text and binary byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text with no further structure
    Raw(String),

    /// A JSON tree
    Json(serde_json::Value),

    /// A finite number
    Numeric(Numeric),

    /// Arbitrary bytes, including NUL and high-bit octets
    Binary(Bytes),
}

impl Value {
    pub fn raw(s: impl Into<String>) -> Self {
        Value::Raw(s.into())
    }

    pub fn json(v: serde_json::Value) -> Self {
        Value::Json(v)
    }

    /// Build a numeric value, rejecting NaN and infinities
    pub fn numeric(n: f64) -> Result<Self> {
        Ok(Value::Numeric(Numeric::new(n)?))
    }

    pub fn binary(b: impl Into<Bytes>) -> Self {
        Value::Binary(b.into())
    }

    /// Load a file's contents as a binary value
    pub fn binary_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        Ok(Value::Binary(Bytes::from(data)))
    }

    /// The flag this value is stored under
    pub fn flag(&self) -> Flag {
        match self {
            Value::Raw(_) => Flag::Raw,
            Value::Json(_) => Flag::Json,
            Value::Numeric(_) => Flag::Numeric,
            Value::Binary(_) => Flag::Binary,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Raw(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(n) => Some(n.get()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Raw(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Raw(s.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Numeric> for Value {
    fn from(n: Numeric) -> Self {
        Value::Numeric(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(Bytes::from(b))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Binary(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Raw(s) => write!(f, "{}", s),
            Value::Json(v) => write!(f, "{}", v),
            Value::Numeric(n) => write!(f, "{}", n),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}
