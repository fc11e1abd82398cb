//! Configuration for FlagKV
//!
//! Centralized configuration with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::codec::BinaryTransport;

/// Main configuration shared by the server, the store client and the harness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// Address of the memcached-compatible store (host:port)
    pub server_addr: String,

    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of worker threads; each serves one connection at a time
    pub worker_threads: usize,

    // -------------------------------------------------------------------------
    // Shared Network Configuration
    // -------------------------------------------------------------------------
    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Largest value accepted by a store (bytes)
    pub max_value_size: usize,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// How BINARY values are carried; writer and reader must agree
    pub binary_transport: BinaryTransport,

    // -------------------------------------------------------------------------
    // Harness Configuration
    // -------------------------------------------------------------------------
    /// Prefix for keys generated by the compatibility harness
    pub key_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:11211".to_string(),
            connect_timeout_ms: 2000,
            listen_addr: "127.0.0.1:11211".to_string(),
            worker_threads: 16,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_value_size: 1024 * 1024, // 1 MB, memcached's default item size
            binary_transport: BinaryTransport::Verbatim,
            key_prefix: "foo".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store address clients connect to
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of server worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum value size (in bytes)
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Set the BINARY transport
    pub fn binary_transport(mut self, transport: BinaryTransport) -> Self {
        self.config.binary_transport = transport;
        self
    }

    /// Set the harness key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
