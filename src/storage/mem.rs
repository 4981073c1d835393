//! In-memory storage engine
//!
//! Keeps every value inline in the MemTable. Nothing survives a restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{CfkvError, Result};
use crate::memtable::{MemTable, MemTableOp, ValueSlot};
use crate::protocol::Context;

use super::{Modify, SnapshotReader, Storage, ValueResolver, WriteBatch};

/// Resolver for engines without a value log
struct InlineValues;

impl ValueResolver for InlineValues {
    fn resolve(&self, slot: &ValueSlot) -> Result<Bytes> {
        match slot {
            ValueSlot::Inline(value) => Ok(value.clone()),
            ValueSlot::Pointer(ptr) => Err(CfkvError::ValueRead(format!(
                "no value log for pointer at offset {}",
                ptr.offset
            ))),
        }
    }
}

/// Volatile engine backed only by the MemTable
pub struct MemStorage {
    memtable: MemTable,
    values: Arc<dyn ValueResolver>,
    running: AtomicBool,
}

impl MemStorage {
    /// Create a running engine with the configured column families
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_column_families(config.column_families.iter().cloned()))
    }

    /// Create a running engine recognizing exactly `column_families`
    pub fn with_column_families<I, S>(column_families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            memtable: MemTable::new(column_families),
            values: Arc::new(InlineValues),
            running: AtomicBool::new(true),
        }
    }

    /// The underlying index (for testing and debugging)
    pub fn memtable(&self) -> &MemTable {
        &self.memtable
    }

    fn ensure_running(&self) -> Result<()> {
        if self.running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CfkvError::EngineUnavailable("memory engine is stopped".to_string()))
        }
    }
}

impl Storage for MemStorage {
    type Reader = SnapshotReader;

    fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    fn reader(&self, _ctx: &Context) -> Result<SnapshotReader> {
        self.ensure_running()?;
        Ok(SnapshotReader::new(
            self.memtable.snapshot(),
            Arc::clone(&self.values),
        ))
    }

    fn write(&self, _ctx: &Context, batch: WriteBatch) -> Result<()> {
        self.ensure_running()?;

        let ops = batch
            .into_iter()
            .map(|modify| match modify {
                Modify::Put { cf, key, value } => MemTableOp::Put {
                    cf,
                    key,
                    slot: ValueSlot::Inline(value),
                },
                Modify::Delete { cf, key } => MemTableOp::Delete { cf, key },
            })
            .collect();

        self.memtable.apply(ops)
    }
}
