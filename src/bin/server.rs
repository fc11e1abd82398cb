//! FlagKV Server Binary
//!
//! Serves the memcached text protocol from an in-memory store.

use std::sync::Arc;

use clap::Parser;
use flagkv::network::Server;
use flagkv::{Config, MemoryStore};
use tracing_subscriber::{fmt, EnvFilter};

/// FlagKV Server
#[derive(Parser, Debug)]
#[command(name = "flagkv-server")]
#[command(about = "In-memory memcached-compatible store for flag-encoded values")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:11211")]
    listen: String,

    /// Worker threads (maximum concurrent connections served)
    #[arg(short, long, default_value = "16")]
    workers: usize,

    /// Largest accepted value in KB
    #[arg(short = 'I', long, default_value = "1024")]
    max_item_kb: usize,

    /// Connection read timeout in milliseconds (0 = none)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flagkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("FlagKV Server v{}", flagkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .worker_threads(args.workers)
        .max_value_size(args.max_item_kb * 1024)
        .read_timeout_ms(args.read_timeout_ms)
        .build();

    let store = Arc::new(MemoryStore::with_max_value_size(config.max_value_size));
    let mut server = Server::new(config, store);

    if let Err(e) = server.bind() {
        tracing::error!("Failed to bind: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
