//! Command definitions
//!
//! Represents requests from clients.

use bytes::Bytes;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Get,
    Set,
    Version,
    Quit,
    Unknown,
}

impl CommandType {
    /// Keyword as it appears on the wire
    pub fn keyword(self) -> &'static str {
        match self {
            CommandType::Get => "get",
            CommandType::Set => "set",
            CommandType::Version => "version",
            CommandType::Quit => "quit",
            CommandType::Unknown => "unknown",
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch one or more keys
    Get { keys: Vec<String> },

    /// Store a data block under a key with a flags word
    Set {
        key: String,
        flags: u32,
        exptime: i64,
        data: Bytes,
        noreply: bool,
    },

    /// Ask for the server version (health check)
    Version,

    /// Close the connection
    Quit,

    /// A keyword the server does not implement
    Unknown { name: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Version => CommandType::Version,
            Command::Quit => CommandType::Quit,
            Command::Unknown { .. } => CommandType::Unknown,
        }
    }

    /// Convenience constructor for a single-key get
    pub fn get(key: impl Into<String>) -> Self {
        Command::Get {
            keys: vec![key.into()],
        }
    }

    /// Convenience constructor for a set that expects a reply
    pub fn set(key: impl Into<String>, flags: u32, data: impl Into<Bytes>) -> Self {
        Command::Set {
            key: key.into(),
            flags,
            exptime: 0,
            data: data.into(),
            noreply: false,
        }
    }
}
