//! cfkv Server Binary
//!
//! Starts the TCP server for cfkv.

use std::sync::Arc;

use cfkv::config::WalSyncStrategy;
use cfkv::network::Server;
use cfkv::{Config, MemStorage, RawKvService, StandaloneStorage, Storage};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// Storage engine to serve from
#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineKind {
    /// Volatile, everything in memory
    Memory,
    /// Durable WAL + value log in the data directory
    Standalone,
}

/// cfkv Server
#[derive(Parser, Debug)]
#[command(name = "cfkv-server")]
#[command(about = "Raw column-family key-value server")]
#[command(version)]
struct Args {
    /// Data directory (standalone engine)
    #[arg(short, long, default_value = "./cfkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:20160")]
    listen: String,

    /// Storage engine
    #[arg(short, long, value_enum, default_value = "standalone")]
    engine: EngineKind,

    /// Column families to recognize (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "default,lock,write")]
    column_families: Vec<String>,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Maximum queued connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Values of at least this many bytes go to the value log
    #[arg(long, default_value = "1024")]
    value_threshold: usize,

    /// fsync the WAL after every write batch
    #[arg(long)]
    sync_every_write: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cfkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("cfkv server v{}", cfkv::VERSION);
    tracing::info!("Engine: {:?}", args.engine);
    tracing::info!("Listen address: {}", args.listen);

    let wal_sync_strategy = if args.sync_every_write {
        WalSyncStrategy::EveryWrite
    } else {
        WalSyncStrategy::EveryNEntries { count: 100 }
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .column_families(args.column_families)
        .worker_threads(args.workers)
        .max_connections(args.max_connections)
        .value_threshold(args.value_threshold)
        .wal_sync_strategy(wal_sync_strategy)
        .build();

    let result = match args.engine {
        EngineKind::Memory => MemStorage::new(&config).and_then(|s| serve(config, s)),
        EngineKind::Standalone => {
            tracing::info!("Data directory: {}", args.data_dir);
            StandaloneStorage::open(config.clone()).and_then(|s| serve(config, s))
        }
    };

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn serve<S: Storage + 'static>(config: Config, storage: S) -> cfkv::Result<()> {
    let storage = Arc::new(storage);
    let service = RawKvService::new(Arc::clone(&storage));

    let server = Server::bind(config, service)?;

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        shutdown.shutdown();
    }) {
        tracing::warn!("Failed to set Ctrl-C handler: {}", e);
    }

    server.run()?;

    // flush the WAL and value log before exiting
    storage.stop()
}
