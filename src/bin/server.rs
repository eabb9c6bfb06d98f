//! menukv Server Binary
//!
//! Opens the engine and serves the menu protocol over TCP.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use menukv::config::WalSyncStrategy;
use menukv::network::Server;
use menukv::{Config, Engine, MenuService};
use tracing_subscriber::{fmt, EnvFilter};

/// menukv Server
#[derive(Parser, Debug)]
#[command(name = "menukv-server")]
#[command(about = "Weekly menu record service")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./menukv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Upper bound for a single storage call, in milliseconds
    #[arg(long, default_value = "2000")]
    storage_timeout_ms: u64,

    /// WAL entries accumulated before a checkpoint
    #[arg(long, default_value = "10000")]
    checkpoint_entries: u64,

    /// When to fsync the WAL
    #[arg(long, value_enum, default_value = "always")]
    sync: SyncMode,

    /// Entries per fsync with `--sync batched`
    #[arg(long, default_value = "100")]
    sync_batch: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SyncMode {
    /// fsync before every acknowledgement
    Always,
    /// fsync every `--sync-batch` entries; an OS crash can lose the tail
    Batched,
}

impl Args {
    fn sync_strategy(&self) -> WalSyncStrategy {
        match self.sync {
            SyncMode::Always => WalSyncStrategy::EveryWrite,
            SyncMode::Batched => WalSyncStrategy::EveryNEntries {
                count: self.sync_batch,
            },
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,menukv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("menukv Server v{}", menukv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("WAL sync: {:?}", args.sync_strategy());

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .storage_timeout_ms(args.storage_timeout_ms)
        .checkpoint_threshold(args.checkpoint_entries)
        .wal_sync_strategy(args.sync_strategy())
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let service = Arc::new(MenuService::new(engine));

    let server = match Server::bind(config, service) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
