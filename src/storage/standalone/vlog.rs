//! Value log
//!
//! Append-only file holding values too large to keep in the index.
//!
//! ## Record Format
//! ```text
//! ┌─────────┬─────────┬──────────────────┐
//! │ Len (4) │ CRC (4) │   Value bytes    │
//! └─────────┴─────────┴──────────────────┘
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{CfkvError, Result};
use crate::memtable::{ValuePointer, ValueSlot};
use crate::storage::ValueResolver;

/// Record header size: Len (4) + CRC (4)
const RECORD_HEADER_SIZE: u64 = 8;

struct VlogFile {
    file: File,

    /// End of the last complete record; appends start here
    end: u64,

    /// Everything before this offset has been fsynced
    synced_end: u64,
}

/// Append-only log of large values
pub struct ValueLog {
    path: PathBuf,
    inner: Mutex<VlogFile>,
}

impl ValueLog {
    /// Open or create the value log at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let end = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(VlogFile {
                file,
                end,
                synced_end: end,
            }),
        })
    }

    /// Append a value, returning where it was written
    pub fn append(&self, value: &[u8]) -> Result<ValuePointer> {
        let len = u32::try_from(value.len()).map_err(|_| {
            CfkvError::WriteApply(format!("value too large: {} bytes", value.len()))
        })?;

        let mut inner = self.inner.lock();
        let VlogFile { file, end, .. } = &mut *inner;
        let offset = *end;

        let mut record = Vec::with_capacity(RECORD_HEADER_SIZE as usize + value.len());
        record.extend_from_slice(&len.to_le_bytes());
        record.extend_from_slice(&crc32fast::hash(value).to_le_bytes());
        record.extend_from_slice(value);

        let written = file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(&record));
        if let Err(e) = written {
            if let Err(cut) = file.set_len(offset) {
                tracing::error!("Failed to roll back partial value log record: {}", cut);
            }
            return Err(e.into());
        }

        *end = offset + record.len() as u64;
        Ok(ValuePointer { offset, len })
    }

    /// Read and verify the value at `ptr`
    ///
    /// Every failure, I/O included, is reported as `ValueRead`.
    pub fn read(&self, ptr: &ValuePointer) -> Result<Bytes> {
        let mut inner = self.inner.lock();
        let file = &mut inner.file;

        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(ptr.offset))
            .and_then(|_| file.read_exact(&mut header))
            .map_err(|e| read_error(ptr, &e.to_string()))?;

        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if len != ptr.len {
            return Err(read_error(
                ptr,
                &format!("record length {} does not match pointer length {}", len, ptr.len),
            ));
        }

        let mut value = vec![0u8; len as usize];
        file.read_exact(&mut value)
            .map_err(|e| read_error(ptr, &e.to_string()))?;

        if crc32fast::hash(&value) != crc {
            return Err(read_error(ptr, "checksum mismatch"));
        }

        Ok(Bytes::from(value))
    }

    /// Flush appended values to disk
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.synced_end < inner.end {
            inner.file.sync_data()?;
            inner.synced_end = inner.end;
        }
        Ok(())
    }

    /// Bytes appended since the last sync
    pub fn unsynced_bytes(&self) -> u64 {
        let inner = self.inner.lock();
        inner.end - inner.synced_end
    }

    /// Size of the log in bytes
    pub fn size(&self) -> u64 {
        self.inner.lock().end
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValueResolver for ValueLog {
    fn resolve(&self, slot: &ValueSlot) -> Result<Bytes> {
        match slot {
            ValueSlot::Inline(value) => Ok(value.clone()),
            ValueSlot::Pointer(ptr) => self.read(ptr),
        }
    }
}

fn read_error(ptr: &ValuePointer, reason: &str) -> CfkvError {
    CfkvError::ValueRead(format!(
        "value log record at offset {} ({} bytes): {}",
        ptr.offset, ptr.len, reason
    ))
}
