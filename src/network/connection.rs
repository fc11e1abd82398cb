//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FlagKvError, Result};
use crate::protocol::{read_command, write_response, Command, ItemValue, Response};
use crate::store::MemoryStore;

/// What to do after a command has been handled
enum Next {
    Reply(Response),
    Silent,
    Close,
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Store all connections share
    store: Arc<MemoryStore>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, store: Arc<MemoryStore>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            store,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses. Malformed requests are
    /// answered in-band and the loop continues; returns when the client
    /// quits or disconnects, or on a fatal I/O error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);
        let max_value_size = self.store.max_value_size();

        loop {
            let command = match read_command(&mut self.reader, max_value_size) {
                Ok(cmd) => cmd,
                Err(FlagKvError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(FlagKvError::Protocol(message)) | Err(FlagKvError::InvalidKey(message)) => {
                    tracing::debug!("Bad request from {}: {}", self.peer_addr, message);
                    self.send_response(Response::client_error(message))?;
                    continue;
                }
                Err(FlagKvError::ValueTooLarge { size, max }) => {
                    tracing::debug!(
                        "Rejected {} byte value from {} (max {})",
                        size,
                        self.peer_addr,
                        max
                    );
                    self.send_response(Response::server_error("object too large for cache"))?;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::server_error(e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received {} from {}", command.command_type().keyword(), self.peer_addr);

            let response = match self.execute_command(command) {
                Next::Reply(response) => response,
                Next::Silent => continue,
                Next::Close => {
                    tracing::debug!("Client {} quit", self.peer_addr);
                    return Ok(());
                }
            };

            if let Err(e) = self.send_response(response) {
                if let FlagKvError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a command against the store
    fn execute_command(&self, command: Command) -> Next {
        match command {
            Command::Get { keys } => {
                let items = keys
                    .into_iter()
                    .filter_map(|key| {
                        self.store
                            .get_shared(&key)
                            .map(|(data, flags)| ItemValue { key, flags, data })
                    })
                    .collect();
                Next::Reply(Response::Values(items))
            }
            Command::Set {
                key,
                flags,
                data,
                noreply,
                ..
            } => {
                let response = match self.store.insert(&key, data, flags) {
                    Ok(()) => Response::Stored,
                    Err(FlagKvError::ValueTooLarge { .. }) => {
                        Response::server_error("object too large for cache")
                    }
                    Err(e) => Response::server_error(e.to_string()),
                };
                if noreply {
                    Next::Silent
                } else {
                    Next::Reply(response)
                }
            }
            Command::Version => Next::Reply(Response::Version(crate::VERSION.to_string())),
            Command::Quit => Next::Close,
            Command::Unknown { name } => {
                tracing::debug!("Unknown command {:?} from {}", name, self.peer_addr);
                Next::Reply(Response::Error)
            }
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Errors that mean the peer went away (or idled past the read timeout)
fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
