//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections
//! - Commands served from a shared [`MemoryStore`](crate::store::MemoryStore)

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
