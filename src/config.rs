//! Configuration for cfkv
//!
//! Centralized configuration with sensible defaults.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{CfkvError, Result};

/// Column family used when a client does not name one
pub const CF_DEFAULT: &str = "default";

/// Column family holding lock records
pub const CF_LOCK: &str = "lock";

/// Column family holding commit records
pub const CF_WRITE: &str = "write";

/// Main configuration for a cfkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the standalone engine's files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── vlog.data        (value log for large values)
    pub data_dir: PathBuf,

    /// Column families recognized by the engine, fixed at open time
    pub column_families: Vec<String>,

    /// Values at least this long are stored in the value log
    pub value_threshold: usize,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max connections queued or being served
    pub max_connections: usize,

    /// Worker threads serving connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write batch (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced batches
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./cfkv_data"),
            column_families: vec![
                CF_DEFAULT.to_string(),
                CF_LOCK.to_string(),
                CF_WRITE.to_string(),
            ],
            value_threshold: 1024,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            listen_addr: "127.0.0.1:20160".to_string(),
            max_connections: 1024,
            worker_threads: 8,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings engines and the server rely on
    pub fn validate(&self) -> Result<()> {
        if self.column_families.is_empty() {
            return Err(CfkvError::Config(
                "at least one column family is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for cf in &self.column_families {
            if cf.is_empty() {
                return Err(CfkvError::Config("empty column family name".to_string()));
            }
            if !seen.insert(cf.as_str()) {
                return Err(CfkvError::Config(format!(
                    "duplicate column family: {}",
                    cf
                )));
            }
        }

        if self.worker_threads == 0 {
            return Err(CfkvError::Config(
                "worker_threads must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(CfkvError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(CfkvError::Config(
                "wal sync interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Replace the recognized column families
    pub fn column_families<I, S>(mut self, cfs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.column_families = cfs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the value size at which values move to the value log
    pub fn value_threshold(mut self, bytes: usize) -> Self {
        self.config.value_threshold = bytes;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the number of connection worker threads
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

    pub fn build(self) -> Config {
        self.config
    }
}
