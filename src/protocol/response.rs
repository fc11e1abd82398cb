//! Response definitions
//!
//! Represents replies to clients.

use bytes::Bytes;

/// One `VALUE` block of a get reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemValue {
    pub key: String,
    pub flags: u32,
    pub data: Bytes,
}

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Zero or more `VALUE` blocks followed by `END`
    Values(Vec<ItemValue>),

    /// `STORED`
    Stored,

    /// `VERSION <version>`
    Version(String),

    /// `ERROR` (unknown command)
    Error,

    /// `CLIENT_ERROR <message>`
    ClientError(String),

    /// `SERVER_ERROR <message>`
    ServerError(String),
}

impl Response {
    /// A get reply with no hits
    pub fn miss() -> Self {
        Response::Values(Vec::new())
    }

    pub fn client_error(message: impl Into<String>) -> Self {
        Response::ClientError(message.into())
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Response::ServerError(message.into())
    }

    /// True for `ERROR`, `CLIENT_ERROR` and `SERVER_ERROR`
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Response::Error | Response::ClientError(_) | Response::ServerError(_)
        )
    }
}
