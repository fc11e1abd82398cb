//! Encode and decode rules
//!
//! ## Mapping
//! ```text
//! ┌───────────────┬──────────┬──────────────────────────────────┐
//! │ Value         │ Flags    │ Bytes                            │
//! ├───────────────┼──────────┼──────────────────────────────────┤
//! │ Raw(s)        │ 0        │ UTF-8 of s                       │
//! │ Json(v)       │ 2        │ serialized JSON document         │
//! │ Binary(b)     │ 4        │ b (through the binary transport) │
//! │ Numeric(n)    │ 8        │ decimal text of n                │
//! │ (any)         │ other    │ decoded as Raw, never an error   │
//! └───────────────┴──────────┴──────────────────────────────────┘
//! ```

use bytes::Bytes;
use serde::Deserialize;

use crate::error::DecodeError;
use super::{BinaryTransport, Flag, Numeric, Value};

/// Output of [`Codec::encode`]: the bytes to store and the flag to store them under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Bytes,
    pub flag: Flag,
}

impl Encoded {
    /// The flags word for the store
    pub fn flags(&self) -> u32 {
        self.flag.bits()
    }
}

/// Stateless value codec
///
/// Safe to share between threads; the only setting is how BINARY bytes are
/// laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codec {
    binary: BinaryTransport,
}

impl Codec {
    pub const fn new(binary: BinaryTransport) -> Self {
        Self { binary }
    }

    pub fn binary_transport(&self) -> BinaryTransport {
        self.binary
    }

    /// Encode a value into stored bytes plus flag. Total over every value.
    pub fn encode(&self, value: &Value) -> Encoded {
        let bytes = match value {
            Value::Raw(s) => Bytes::copy_from_slice(s.as_bytes()),
            Value::Json(v) => Bytes::from(v.to_string()),
            Value::Numeric(n) => Bytes::from(format_number(*n)),
            Value::Binary(b) => match self.binary {
                BinaryTransport::Verbatim => b.clone(),
                transport => Bytes::from(transport.to_wire(b)),
            },
        };

        Encoded {
            bytes,
            flag: value.flag(),
        }
    }

    /// Decode stored bytes according to their flags word
    ///
    /// Unknown flags decode as [`Value::Raw`] and never fail.
    pub fn decode(&self, bytes: &[u8], flags: u32) -> Result<Value, DecodeError> {
        let flag = match Flag::from_bits(flags) {
            Some(flag) => flag,
            None => {
                tracing::trace!("Unknown flags {}, decoding as raw text", flags);
                return Ok(Value::Raw(text(bytes)));
            }
        };

        match flag {
            Flag::Raw => Ok(Value::Raw(text(bytes))),
            Flag::Json => parse_json(bytes).map(Value::Json),
            Flag::Numeric => parse_number(bytes).map(Value::Numeric),
            Flag::Binary => self
                .binary
                .from_wire(bytes)
                .map(|b| Value::Binary(Bytes::from(b))),
        }
    }
}

/// Encode with the default (verbatim binary) codec
pub fn encode(value: &Value) -> Encoded {
    Codec::default().encode(value)
}

/// Decode with the default (verbatim binary) codec
pub fn decode(bytes: &[u8], flags: u32) -> Result<Value, DecodeError> {
    Codec::default().decode(bytes, flags)
}

/// Bytes as text; invalid UTF-8 sequences become U+FFFD
fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse a JSON document of any nesting depth
///
/// Encoding never limits depth, so decoding must not either.
fn parse_json(bytes: &[u8]) -> Result<serde_json::Value, DecodeError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    de.disable_recursion_limit();

    let doc = serde_json::Value::deserialize(serde_stacker::Deserializer::new(&mut de))
        .map_err(DecodeError::MalformedJson)?;
    de.end().map_err(DecodeError::MalformedJson)?;
    Ok(doc)
}

/// Format a number the way ECMAScript `Number#toString` does
///
/// Shortest round-trip digits; plain notation for 1e-6 <= |n| < 1e21,
/// exponent notation with an explicit sign otherwise.
pub fn format_number(n: Numeric) -> String {
    let n = n.get();
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", n);
    }

    let s = format!("{:e}", n);
    match s.find('e') {
        Some(pos) if !s[pos + 1..].starts_with('-') => {
            format!("{}e+{}", &s[..pos], &s[pos + 1..])
        }
        _ => s,
    }
}

/// Parse decimal text into a finite number
fn parse_number(bytes: &[u8]) -> Result<Numeric, DecodeError> {
    let malformed = || DecodeError::MalformedNumber(text(bytes));

    let s = std::str::from_utf8(bytes).map_err(|_| malformed())?;
    let n: f64 = s
        .trim_matches(|c: char| c.is_ascii_whitespace())
        .parse()
        .map_err(|_| malformed())?;

    Numeric::new(n).map_err(|_| malformed())
}
