//! MemTable Module
//!
//! In-memory ordered index shared by every storage engine.
//!
//! ## Responsibilities
//! - One ordered keyspace per column family
//! - Point-in-time snapshots for readers
//! - All-or-nothing application of a batch of operations
//!
//! ## Data Structure Choice
//! Each column family is an `Arc<BTreeMap>` behind a single RwLock:
//! - Ordered keys (byte-lexicographic, as `Bytes` compares)
//! - A snapshot is a set of `Arc` clones, taken under the read lock
//! - Writers copy-on-write with `Arc::make_mut`, so a live snapshot
//!   never observes later writes

mod table;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use table::{CfMap, MemTable, MemTableSnapshot};

/// Location of a value stored out of line in the value log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePointer {
    /// Offset of the record header in the value log
    pub offset: u64,

    /// Length of the value bytes (header excluded)
    pub len: u32,
}

/// Value held by the MemTable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSlot {
    /// Value bytes stored in the index itself
    Inline(Bytes),

    /// Value stored in the value log
    Pointer(ValuePointer),
}

/// A single resolved mutation applied to the MemTable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemTableOp {
    /// Insert or replace a key
    Put { cf: String, key: Bytes, slot: ValueSlot },

    /// Remove a key (absent keys are ignored)
    Delete { cf: String, key: Bytes },
}

impl MemTableOp {
    /// Column family this operation targets
    pub fn cf(&self) -> &str {
        match self {
            MemTableOp::Put { cf, .. } | MemTableOp::Delete { cf, .. } => cf,
        }
    }
}
