//! StashKV Server Binary
//!
//! Loads the snapshot, serves TCP clients, and saves the snapshot on
//! SIGINT/SIGTERM.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use stashkv::config::{DEFAULT_SNAPSHOT_BUCKET, DEFAULT_SNAPSHOT_FILE};
use stashkv::network::Server;
use stashkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// StashKV Server
#[derive(Parser, Debug)]
#[command(name = "stashkv-server")]
#[command(about = "Concurrent object store with on-disk snapshots")]
#[command(version)]
struct Args {
    /// Snapshot file loaded at startup and written at shutdown
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_FILE)]
    snapshot: String,

    /// Bucket inside the snapshot file
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_BUCKET)]
    bucket: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Number of store shards
    #[arg(long, default_value = "32")]
    shards: usize,

    /// Maximum object size in bytes
    #[arg(long, default_value = "1000000")]
    max_object_size: usize,

    /// Grace period for open connections at shutdown (milliseconds)
    #[arg(long, default_value = "5000")]
    shutdown_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stashkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("StashKV Server v{}", stashkv::VERSION);
    tracing::info!("Snapshot file: {} (bucket {:?})", args.snapshot, args.bucket);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .snapshot_path(&args.snapshot)
        .snapshot_bucket(&args.bucket)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .store_shards(args.shards)
        .max_object_size(args.max_object_size)
        .shutdown_timeout_ms(args.shutdown_timeout_ms)
        .build();

    // Open engine (a failed snapshot load is logged and skipped inside)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    // SIGINT/SIGTERM stop the accept loop
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    tracing::info!("Saving data...");
    if let Err(e) = engine.save() {
        tracing::error!("Failed to save snapshot: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
