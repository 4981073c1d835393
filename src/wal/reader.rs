//! WAL Reader
//!
//! Sequentially reads and verifies records from a WAL.

use std::io::{ErrorKind, Read};

use crate::error::{CfkvError, Result};

use super::entry::{WalEntry, HEADER_SIZE, MAX_RECORD_SIZE};

/// Reads entries from a WAL stream
pub struct WalReader<R: Read> {
    inner: R,

    /// Byte offset just past the last valid record
    valid_offset: u64,
}

impl<R: Read> WalReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            valid_offset: 0,
        }
    }

    /// Read the next entry
    ///
    /// Returns:
    /// - `Ok(Some(entry))`: a complete, verified record
    /// - `Ok(None)`: clean end of log
    /// - `Err(WalCorruption)`: torn or corrupted record
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.inner, &mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => {
                return Err(CfkvError::WalCorruption(format!(
                    "torn record header at offset {}",
                    self.valid_offset
                )))
            }
            _ => {}
        }

        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if len > MAX_RECORD_SIZE {
            return Err(CfkvError::WalCorruption(format!(
                "record length {} at offset {} exceeds maximum",
                len, self.valid_offset
            )));
        }

        let mut payload = vec![0u8; len];
        if read_full(&mut self.inner, &mut payload)? < len {
            return Err(CfkvError::WalCorruption(format!(
                "torn record payload at offset {}",
                self.valid_offset
            )));
        }

        if crc32fast::hash(&payload) != crc {
            return Err(CfkvError::WalCorruption(format!(
                "checksum mismatch at offset {}",
                self.valid_offset
            )));
        }

        let entry = WalEntry::decode(&payload)?;
        self.valid_offset += (HEADER_SIZE + len) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last record returned
    pub fn valid_offset(&self) -> u64 {
        self.valid_offset
    }
}

/// Fill `buf` as far as the stream allows, returning bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
