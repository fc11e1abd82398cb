//! Codec Module
//!
//! Maps application values to `(bytes, flags)` pairs and back.
//!
//! ## Flags
//! - 0: RAW     - bytes are text verbatim
//! - 2: JSON    - bytes are a JSON document
//! - 4: BINARY  - bytes are opaque binary content
//! - 8: NUMERIC - bytes are the decimal text of a number
//!
//! Flags are the only channel between clients: bytes alone are ambiguous
//! (`"3.14"` may be RAW or NUMERIC), so every reader must decode by flag.

mod flag;
mod value;
mod binary;
mod rules;

pub use flag::Flag;
pub use value::{Numeric, Value};
pub use binary::BinaryTransport;
pub use rules::{decode, encode, format_number, Codec, Encoded};
