//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::Path;

use crate::error::{CfkvError, Result};

use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Last valid LSN (0 if the log was empty)
    pub last_lsn: u64,

    /// Length of the valid prefix of the log
    pub valid_bytes: u64,

    /// Whether a torn or corrupted tail was cut off
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read entries until the end or the first bad record
    /// 2. Truncate the file to the valid prefix
    /// 3. Return all valid entries in order
    ///
    /// A missing file recovers as an empty log.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        if !path.exists() {
            return Ok((Vec::new(), RecoveryResult::default()));
        }

        let (entries, result) = Self::scan(path)?;

        if result.was_truncated {
            tracing::warn!(
                "Truncating WAL {} to {} bytes after last valid entry (lsn={})",
                path.display(),
                result.valid_bytes,
                result.last_lsn
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_bytes)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path).map(|(_, result)| result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = WalReader::new(BufReader::new(file));

        let mut entries = Vec::new();
        let mut last_lsn = 0;
        let mut valid_bytes = 0;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if entry.lsn <= last_lsn {
                        tracing::warn!(
                            "WAL entry lsn {} does not follow {}; stopping replay",
                            entry.lsn,
                            last_lsn
                        );
                        break;
                    }
                    last_lsn = entry.lsn;
                    valid_bytes = reader.valid_offset();
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(CfkvError::WalCorruption(reason)) => {
                    tracing::warn!("WAL corruption in {}: {}", path.display(), reason);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let result = RecoveryResult {
            entries_recovered: entries.len() as u64,
            last_lsn,
            valid_bytes,
            was_truncated: valid_bytes < file_len,
        };

        Ok((entries, result))
    }
}
