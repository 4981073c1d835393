//! WAL Entry definitions
//!
//! Defines the structure of individual WAL records.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CfkvError, Result};
use crate::memtable::MemTableOp;

/// Record header size: Len (4) + CRC (4)
pub const HEADER_SIZE: usize = 8;

/// Largest payload a record may carry (256 MB)
pub const MAX_RECORD_SIZE: usize = 256 * 1024 * 1024;

/// A single entry in the WAL: one applied write batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,

    /// Operations of the batch, values already resolved to slots
    pub ops: Vec<MemTableOp>,
}

impl WalEntry {
    pub fn new(lsn: u64, ops: Vec<MemTableOp>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self { lsn, timestamp, ops }
    }

    /// Encode as a framed record: len + crc + payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_RECORD_SIZE {
            return Err(CfkvError::WriteApply(format!(
                "WAL record too large: {} bytes (max {})",
                payload.len(),
                MAX_RECORD_SIZE
            )));
        }
        let len = payload.len() as u32;

        let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
        record.extend_from_slice(&len.to_le_bytes());
        record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        record.extend_from_slice(&payload);
        Ok(record)
    }

    /// Decode a payload after its checksum has been verified
    pub fn decode(payload: &[u8]) -> Result<Self> {
        bincode::deserialize(payload)
            .map_err(|e| CfkvError::WalCorruption(format!("undecodable entry: {}", e)))
    }
}
