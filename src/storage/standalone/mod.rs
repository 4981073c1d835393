//! Standalone storage engine
//!
//! Durable single-node engine.
//!
//! ## Layout
//! ```text
//!   {data_dir}/
//!     ├── wal.log      one record per write batch
//!     └── vlog.data    values >= value_threshold
//! ```
//!
//! ## Write path
//! 1. Check every column family in the batch
//! 2. Append large values to the value log and fsync it
//! 3. Append the batch to the WAL (fsync per sync strategy)
//! 4. Apply the batch to the MemTable, making it visible
//!
//! Steps 2-4 run under one lock, so batches become visible in WAL order.
//! A failure in 2 or 3 leaves the MemTable untouched.
//!
//! ## Recovery
//! The WAL is replayed into a fresh MemTable on open. A torn tail is
//! truncated; pointers into the value log stay valid because values are
//! written before the WAL record that references them.

mod vlog;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{CfkvError, Result};
use crate::memtable::{MemTable, MemTableOp, ValueSlot};
use crate::protocol::Context;
use crate::wal::{WalRecovery, WalWriter};

use super::{Modify, SnapshotReader, Storage, ValueResolver, WriteBatch};

pub use vlog::ValueLog;

/// WAL + value log engine with an in-memory index
pub struct StandaloneStorage {
    /// Engine configuration
    config: Config,

    /// Index of every live key (internal RwLock)
    memtable: MemTable,

    /// Out-of-line values, shared with readers
    vlog: Arc<ValueLog>,

    /// Write-ahead log; also serializes write batches
    wal: Mutex<WalWriter>,

    running: AtomicBool,
}

impl StandaloneStorage {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const VLOG_FILENAME: &'static str = "vlog.data";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Open the value log
    /// 3. Replay the WAL into the MemTable
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir)?;
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let vlog_path = config.data_dir.join(Self::VLOG_FILENAME);

        let vlog = Arc::new(ValueLog::open(&vlog_path)?);
        let memtable = MemTable::new(config.column_families.iter().cloned());

        let (entries, recovery) = WalRecovery::recover(&wal_path)?;
        for entry in entries {
            let lsn = entry.lsn;
            memtable.apply(entry.ops).map_err(|e| match e {
                CfkvError::ColumnFamilyNotFound(cf) => CfkvError::Config(format!(
                    "WAL entry {} references column family {} which is not configured",
                    lsn, cf
                )),
                other => other,
            })?;
        }

        if recovery.entries_recovered > 0 || recovery.was_truncated {
            tracing::info!(
                "WAL recovery: {} entries replayed, last_lsn={}, truncated={}",
                recovery.entries_recovered,
                recovery.last_lsn,
                recovery.was_truncated
            );
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy, recovery.last_lsn + 1)?;

        tracing::info!(
            "Standalone storage opened at {} with column families {:?}",
            config.data_dir.display(),
            config.column_families
        );

        Ok(Self {
            config,
            memtable,
            vlog,
            wal: Mutex::new(wal),
            running: AtomicBool::new(true),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CfkvError::EngineUnavailable(
                "standalone engine is stopped".to_string(),
            ))
        }
    }

    /// Turn a batch into MemTable operations, moving large values out of line
    fn resolve_batch(&self, batch: WriteBatch) -> Result<Vec<MemTableOp>> {
        batch
            .into_iter()
            .map(|modify| match modify {
                Modify::Put { cf, key, value } => {
                    let slot = if value.len() >= self.config.value_threshold {
                        ValueSlot::Pointer(self.vlog.append(&value)?)
                    } else {
                        ValueSlot::Inline(value)
                    };
                    Ok(MemTableOp::Put { cf, key, slot })
                }
                Modify::Delete { cf, key } => Ok(MemTableOp::Delete { cf, key }),
            })
            .collect()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the value log file
    pub fn vlog_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::VLOG_FILENAME)
    }

    /// Path of the WAL file
    pub fn wal_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::WAL_FILENAME)
    }

    /// LSN of the last applied batch
    pub fn current_lsn(&self) -> u64 {
        self.wal.lock().current_lsn()
    }

    /// The value log
    pub fn vlog(&self) -> &ValueLog {
        &self.vlog
    }

    /// The underlying index
    pub fn memtable(&self) -> &MemTable {
        &self.memtable
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Storage for StandaloneStorage {
    type Reader = SnapshotReader;

    fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Sync both logs and refuse further requests
    fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);

        let mut wal = self.wal.lock();
        self.vlog.sync()?;
        wal.sync()?;
        tracing::info!("Standalone storage stopped at lsn {}", wal.current_lsn());
        Ok(())
    }

    fn reader(&self, _ctx: &Context) -> Result<SnapshotReader> {
        self.ensure_running()?;
        let values: Arc<dyn ValueResolver> = self.vlog.clone();
        Ok(SnapshotReader::new(self.memtable.snapshot(), values))
    }

    fn write(&self, _ctx: &Context, batch: WriteBatch) -> Result<()> {
        self.ensure_running()?;
        if batch.is_empty() {
            return Ok(());
        }

        for modify in batch.iter() {
            self.memtable.check_cf(modify.cf())?;
        }

        let mut wal = self.wal.lock();

        let ops = self
            .resolve_batch(batch)
            .map_err(|e| CfkvError::WriteApply(e.to_string()))?;

        // a WAL record must never reach disk ahead of the values it points to
        let has_pointers = ops.iter().any(|op| {
            matches!(
                op,
                MemTableOp::Put {
                    slot: ValueSlot::Pointer(_),
                    ..
                }
            )
        });
        if has_pointers {
            self.vlog
                .sync()
                .map_err(|e| CfkvError::WriteApply(e.to_string()))?;
        }

        wal.append(ops.clone())
            .map_err(|e| CfkvError::WriteApply(e.to_string()))?;

        if wal.needs_sync() {
            wal.sync()
                .map_err(|e| CfkvError::WriteApply(e.to_string()))?;
        }

        self.memtable.apply(ops)
    }
}
