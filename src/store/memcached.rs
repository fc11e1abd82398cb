//! Memcached store client
//!
//! Speaks the text protocol to a memcached-compatible server over one TCP
//! connection.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{FlagKvError, Result};
use crate::protocol::{read_response, validate_key, write_command, Command, Response};
use super::{Store, StoredItem};

/// Buffered halves of one TCP connection
struct Conn {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Store backed by a memcached-compatible server
///
/// Requests are serialized over a single connection. After an I/O error or
/// a reply that cannot be parsed, the stream position is unknown, so the
/// connection is dropped and later calls fail with [`FlagKvError::Connection`].
/// An oversized value is skipped in full and keeps the connection.
pub struct MemcachedStore {
    /// Peer address, for logging
    addr: String,

    /// `None` once closed or broken
    conn: Mutex<Option<Conn>>,

    /// Largest value sent or accepted
    max_value_size: usize,
}

impl MemcachedStore {
    /// Connect to `config.server_addr` and check the peer answers `version`
    pub fn connect(config: &Config) -> Result<Self> {
        let addr = config.server_addr.clone();
        let stream = Self::open_stream(&addr, config.connect_timeout_ms)?;

        stream.set_nodelay(true)?;
        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        let read_stream = stream.try_clone()?;
        let store = Self {
            addr,
            conn: Mutex::new(Some(Conn {
                reader: BufReader::new(read_stream),
                writer: BufWriter::new(stream),
            })),
            max_value_size: config.max_value_size,
        };

        let version = store
            .version()
            .map_err(|e| FlagKvError::Connection(format!("{} did not answer version: {}", store.addr, e)))?;
        tracing::debug!("Connected to {} (server version {})", store.addr, version);

        Ok(store)
    }

    /// Resolve `addr` and connect to the first address that accepts
    fn open_stream(addr: &str, connect_timeout_ms: u64) -> Result<TcpStream> {
        let candidates = addr
            .to_socket_addrs()
            .map_err(|e| FlagKvError::Connection(format!("cannot resolve {}: {}", addr, e)))?;

        let timeout = Duration::from_millis(connect_timeout_ms.max(1));
        let mut last_error = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(FlagKvError::Connection(match last_error {
            Some(e) => format!("cannot connect to {}: {}", addr, e),
            None => format!("{} resolved to no addresses", addr),
        }))
    }

    /// Ask the server for its version string
    pub fn version(&self) -> Result<String> {
        match self.round_trip(&Command::Version)? {
            Response::Version(version) => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    /// Peer address this store was opened with
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one command and read its reply
    fn round_trip(&self, command: &Command) -> Result<Response> {
        let mut guard = self.conn.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| FlagKvError::Connection(format!("connection to {} is closed", self.addr)))?;

        tracing::trace!("Sending {} to {}", command.command_type().keyword(), self.addr);

        let result = write_command(&mut conn.writer, command)
            .and_then(|()| read_response(&mut conn.reader, self.max_value_size));

        match result {
            // In-band replies and skipped oversized values leave the stream in sync
            Ok(_) | Err(FlagKvError::ValueTooLarge { .. }) => {}
            Err(ref e) => {
                tracing::warn!("Dropping connection to {} after error: {}", self.addr, e);
                *guard = None;
            }
        }
        result
    }
}

impl Store for MemcachedStore {
    fn set(&self, key: &str, bytes: &[u8], flags: u32) -> Result<()> {
        validate_key(key)?;
        if bytes.len() > self.max_value_size {
            return Err(FlagKvError::ValueTooLarge {
                size: bytes.len(),
                max: self.max_value_size,
            });
        }

        match self.round_trip(&Command::set(key, flags, Bytes::copy_from_slice(bytes)))? {
            Response::Stored => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn get(&self, key: &str) -> Result<StoredItem> {
        validate_key(key)?;

        match self.round_trip(&Command::get(key))? {
            Response::Values(items) => items
                .into_iter()
                .find(|item| item.key == key)
                .map(|item| StoredItem {
                    key: item.key,
                    bytes: item.data,
                    flags: item.flags,
                })
                .ok_or(FlagKvError::KeyNotFound),
            other => Err(unexpected(other)),
        }
    }

    fn close(&self) -> Result<()> {
        if let Some(mut conn) = self.conn.lock().take() {
            if let Err(e) = write_command(&mut conn.writer, &Command::Quit) {
                tracing::debug!("quit to {} failed: {}", self.addr, e);
            }
            let _ = conn.writer.get_ref().shutdown(Shutdown::Both);
            tracing::debug!("Closed connection to {}", self.addr);
        }
        Ok(())
    }
}

/// Map a reply that does not fit the request to an error
fn unexpected(response: Response) -> FlagKvError {
    match response {
        Response::ServerError(message) => FlagKvError::Store(message),
        Response::ClientError(message) => FlagKvError::Protocol(message),
        Response::Error => FlagKvError::Protocol("server rejected the command".to_string()),
        other => FlagKvError::Protocol(format!("unexpected response: {:?}", other)),
    }
}
