//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;
use crate::memtable::MemTableOp;

use super::WalEntry;

/// Writes entries to the WAL file
///
/// Not thread-safe on its own; the owning engine serializes access.
pub struct WalWriter {
    file: File,
    path: PathBuf,

    /// End of the last fully written record
    offset: u64,

    /// LSN assigned to the next entry
    next_lsn: u64,

    sync_strategy: WalSyncStrategy,

    /// Entries appended since the last fsync
    unsynced: usize,
}

impl WalWriter {
    /// Open or create a WAL file, appending after its current end
    ///
    /// `next_lsn` continues the sequence found during recovery.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, next_lsn: u64) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let offset = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            offset,
            next_lsn,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append one batch as a single record, returning its LSN
    ///
    /// A failed append is cut back off the file so later records stay
    /// reachable during recovery. The record is not fsynced here; see
    /// [`WalWriter::needs_sync`].
    pub fn append(&mut self, ops: Vec<MemTableOp>) -> Result<u64> {
        let lsn = self.next_lsn;
        let record = WalEntry::new(lsn, ops).encode()?;

        if let Err(e) = self.file.write_all(&record) {
            self.rollback();
            return Err(e.into());
        }

        self.offset += record.len() as u64;
        self.next_lsn += 1;
        self.unsynced += 1;
        Ok(lsn)
    }

    /// Check if the sync strategy calls for an fsync now
    pub fn needs_sync(&self) -> bool {
        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.unsynced > 0,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN of the most recently appended entry (0 if none)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn.saturating_sub(1)
    }

    /// Bytes of valid log
    pub fn size(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rollback(&mut self) {
        let restored = self
            .file
            .set_len(self.offset)
            .and_then(|_| self.file.seek(SeekFrom::Start(self.offset)).map(|_| ()));
        if let Err(e) = restored {
            tracing::error!("Failed to roll back partial WAL record: {}", e);
        }
    }
}
