//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use crate::config::Config;
use crate::error::{FlagKvError, Result};
use crate::store::MemoryStore;
use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cloneable handle that stops a running [`Server`]
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting and return from `run`
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server speaking the memcached text protocol
///
/// ## Threading
/// - One acceptor (the thread calling `run`)
/// - `worker_threads` workers fed over a bounded crossbeam channel; each
///   serves one connection at a time
pub struct Server {
    config: Config,
    store: Arc<MemoryStore>,
    listener: Option<TcpListener>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Create a new server with the given config and store
    pub fn new(config: Config, store: Arc<MemoryStore>) -> Self {
        Self {
            config,
            store,
            listener: None,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// Bind the listen address; returns the bound address
    ///
    /// Binding to port 0 picks a free port, which `local_addr` then reports.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            FlagKvError::Config(format!("cannot listen on {}: {}", self.config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        tracing::info!("Listening on {}", addr);
        Ok(addr)
    }

    /// Address the server is bound to, if bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        if self.config.worker_threads == 0 {
            return Err(FlagKvError::Config("worker_threads must be at least 1".to_string()));
        }
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.as_ref() {
            Some(listener) => listener,
            None => return Err(FlagKvError::Config("server is not bound".to_string())),
        };

        let (tx, rx) = channel::bounded::<TcpStream>(self.config.worker_threads);
        let mut workers = Vec::with_capacity(self.config.worker_threads);
        for id in 0..self.config.worker_threads {
            let rx = rx.clone();
            let store = Arc::clone(&self.store);
            let config = self.config.clone();
            let worker = thread::Builder::new()
                .name(format!("flagkv-worker-{}", id))
                .spawn(move || worker_loop(rx, store, config))?;
            workers.push(worker);
        }
        drop(rx);

        while !self.shutdown.is_shutdown() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    tracing::trace!("Accepted connection from {}", peer);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    if tx.send(stream).is_err() {
                        tracing::error!("All workers exited; stopping accept loop");
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down, waiting for open connections to finish");
        drop(tx);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Handle for stopping the server from another thread while `run` blocks
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

/// Serve connections until the channel closes
fn worker_loop(rx: Receiver<TcpStream>, store: Arc<MemoryStore>, config: Config) {
    for stream in rx.iter() {
        let served = panic::catch_unwind(AssertUnwindSafe(|| {
            Connection::new(stream, Arc::clone(&store)).and_then(|mut conn| {
                conn.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
                conn.handle()
            })
        }));

        match served {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Connection ended with error: {}", e),
            // The connection is lost but the worker keeps serving
            Err(_) => tracing::error!("Connection handler panicked"),
        }
    }
}
