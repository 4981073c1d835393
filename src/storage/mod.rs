//! Storage Module
//!
//! The contract every storage engine fulfils, plus the engines shipped with
//! cfkv.
//!
//! ## Contract
//! - [`Storage`]: hands out snapshot readers and applies write batches
//! - [`StorageReader`]: point lookups and per-column-family iterators over
//!   one snapshot; released when dropped
//! - [`DbIterator`]: cursor in byte-lexicographic key order
//! - [`DbItem`]: current entry; the value read may fail on its own
//!
//! ## Engines
//! - [`MemStorage`]: everything in memory
//! - [`StandaloneStorage`]: WAL + value log on disk, MemTable index in memory

mod mem;
mod modify;
mod snapshot;
mod standalone;

use bytes::Bytes;

use crate::error::Result;
use crate::memtable::ValueSlot;
use crate::protocol::Context;

pub use mem::MemStorage;
pub use modify::{Modify, WriteBatch};
pub use snapshot::{SnapshotIterator, SnapshotReader};
pub use standalone::{StandaloneStorage, ValueLog};

/// A column-family-organized key-value engine
///
/// Implementations must be safe to share across request threads: every
/// read goes through a [`StorageReader`] snapshot and every write through an
/// atomically applied [`WriteBatch`].
pub trait Storage: Send + Sync {
    /// Snapshot reader handed out per request
    type Reader: StorageReader;

    /// Make the engine available for requests
    fn start(&self) -> Result<()>;

    /// Stop serving; later `reader`/`write` calls fail
    fn stop(&self) -> Result<()>;

    /// Open a reader over the current state
    ///
    /// # Errors
    ///
    /// `EngineUnavailable` when stopped, `InvalidContext` if the engine
    /// rejects the context.
    fn reader(&self, ctx: &Context) -> Result<Self::Reader>;

    /// Apply a batch atomically
    ///
    /// # Errors
    ///
    /// `ColumnFamilyNotFound` for an unrecognized column family, `WriteApply`
    /// when the engine fails to persist the batch. On error the caller must
    /// treat the whole batch as not applied.
    fn write(&self, ctx: &Context, batch: WriteBatch) -> Result<()>;
}

/// A consistent view of the engine, owned by one request
pub trait StorageReader {
    /// Value of `key` in `cf` as of the snapshot; `Ok(None)` when absent
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Bytes>>;

    /// Cursor over `cf` as of the snapshot
    ///
    /// Never fails; an unusable cursor is never valid and reports the cause
    /// through [`DbIterator::status`].
    fn iter_cf(&self, cf: &str) -> Box<dyn DbIterator + '_>;

    /// Release the snapshot. Calling it again is a no-op.
    fn close(&mut self);
}

/// Cursor over one column family
///
/// Starts unpositioned. `seek` or `next` move it to an entry or past the
/// end; only `seek` recovers from past the end.
pub trait DbIterator {
    /// Position at the first key >= `key`
    fn seek(&mut self, key: &[u8]);

    /// True while positioned on an entry
    fn valid(&self) -> bool;

    /// Advance one entry
    fn next(&mut self);

    /// Current entry, `None` unless valid
    fn item(&self) -> Option<&dyn DbItem>;

    /// Error that made the cursor unusable, if any
    fn status(&self) -> Result<()>;
}

/// Entry under a cursor
pub trait DbItem {
    fn key(&self) -> &[u8];

    /// Read the value; may require a secondary read that can fail
    fn value(&self) -> Result<Bytes>;
}

/// Turns MemTable value slots into value bytes
pub trait ValueResolver: Send + Sync {
    fn resolve(&self, slot: &ValueSlot) -> Result<Bytes>;
}
