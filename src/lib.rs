//! # FlagKV
//!
//! A flag-encoded value codec that lets two independent cache clients share
//! one memcached-compatible store:
//! - A typed client storing JSON documents, numbers, text and binary blobs
//! - A byte client storing raw buffers under caller-chosen flags
//! - A small integer flags word, stored next to the bytes, as the only
//!   contract between them
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────┐
//! │   TypedClient    │                    │    ByteClient    │
//! │ (Value in / out) │                    │ (bytes + flags)  │
//! └────────┬─────────┘                    └────────┬─────────┘
//!          │ Codec::encode / decode                │ Codec::decode on request
//!          ▼                                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Store (bytes, flags)                    │
//! │         MemoryStore  |  MemcachedStore ── TCP ──┐        │
//! └─────────────────────────────────────────────────┼───────┘
//!                                                   ▼
//!                                      ┌────────────────────────┐
//!                                      │   Server (memcached    │
//!                                      │   text protocol)       │
//!                                      └────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod protocol;
pub mod store;
pub mod network;
pub mod client;
pub mod harness;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DecodeError, FlagKvError, Result};
pub use config::Config;
pub use codec::{decode, encode, BinaryTransport, Codec, Encoded, Flag, Numeric, Value};
pub use store::{MemcachedStore, MemoryStore, Store, StoredItem};
pub use client::{ByteClient, TypedClient};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FlagKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
