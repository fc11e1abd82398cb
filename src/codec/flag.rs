//! Flag definitions
//!
//! The flag values are the compatibility surface between clients and must
//! never be renumbered.

use std::fmt;

/// Logical type tag stored next to the bytes of every item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Flag {
    /// Bytes are the value's text verbatim
    Raw = 0,

    /// Bytes are a JSON document
    Json = 2,

    /// Bytes are opaque binary content
    Binary = 4,

    /// Bytes are the decimal text of a number
    Numeric = 8,
}

impl Flag {
    /// All known flags, in wire order
    pub const ALL: [Flag; 4] = [Flag::Raw, Flag::Json, Flag::Binary, Flag::Numeric];

    /// Map a stored flags word to a known flag
    ///
    /// Returns `None` for values this codec does not know; callers treat
    /// those as [`Flag::Raw`].
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Flag::Raw),
            2 => Some(Flag::Json),
            4 => Some(Flag::Binary),
            8 => Some(Flag::Numeric),
            _ => None,
        }
    }

    /// The flags word written to the store
    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::Raw => "RAW",
            Flag::Json => "JSON",
            Flag::Binary => "BINARY",
            Flag::Numeric => "NUMERIC",
        }
    }
}

impl From<Flag> for u32 {
    fn from(flag: Flag) -> Self {
        flag.bits()
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.bits())
    }
}
