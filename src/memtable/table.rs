//! MemTable implementation
//!
//! Column-family map of copy-on-write BTreeMaps.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{CfkvError, Result};

use super::{MemTableOp, ValueSlot};

/// Ordered contents of one column family
pub type CfMap = BTreeMap<Bytes, ValueSlot>;

/// In-memory index partitioned by column family
///
/// ## Concurrency:
/// - `cfs`: RwLock held only long enough to clone `Arc`s (readers) or to
///   apply one batch (writers)
/// - The set of column families never changes after construction
pub struct MemTable {
    cfs: RwLock<HashMap<String, Arc<CfMap>>>,
}

impl MemTable {
    /// Create an empty MemTable recognizing the given column families
    pub fn new<I, S>(column_families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cfs = column_families
            .into_iter()
            .map(|cf| (cf.into(), Arc::new(CfMap::new())))
            .collect();

        Self {
            cfs: RwLock::new(cfs),
        }
    }

    /// Take a point-in-time snapshot of every column family
    pub fn snapshot(&self) -> MemTableSnapshot {
        let cfs = self.cfs.read().clone();
        MemTableSnapshot { cfs }
    }

    /// Fail with `ColumnFamilyNotFound` unless `cf` is recognized
    pub fn check_cf(&self, cf: &str) -> Result<()> {
        if self.cfs.read().contains_key(cf) {
            Ok(())
        } else {
            Err(CfkvError::ColumnFamilyNotFound(cf.to_string()))
        }
    }

    /// Apply a batch of operations as one unit
    ///
    /// Every column family is checked before anything is modified, so an
    /// unknown column family leaves the table untouched. Readers see either
    /// none or all of the batch.
    pub fn apply(&self, ops: Vec<MemTableOp>) -> Result<()> {
        let mut cfs = self.cfs.write();

        if let Some(op) = ops.iter().find(|op| !cfs.contains_key(op.cf())) {
            return Err(CfkvError::ColumnFamilyNotFound(op.cf().to_string()));
        }

        for op in ops {
            match op {
                MemTableOp::Put { cf, key, slot } => {
                    if let Some(map) = cfs.get_mut(&cf) {
                        Arc::make_mut(map).insert(key, slot);
                    }
                }
                MemTableOp::Delete { cf, key } => {
                    if let Some(map) = cfs.get_mut(&cf) {
                        Arc::make_mut(map).remove(&key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Names of the recognized column families, sorted
    pub fn column_families(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cfs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of live keys in a column family
    pub fn entry_count(&self, cf: &str) -> Result<usize> {
        self.cfs
            .read()
            .get(cf)
            .map(|map| map.len())
            .ok_or_else(|| CfkvError::ColumnFamilyNotFound(cf.to_string()))
    }

    /// Check if every column family is empty
    pub fn is_empty(&self) -> bool {
        self.cfs.read().values().all(|map| map.is_empty())
    }
}

/// Immutable view of a MemTable at the moment it was taken
#[derive(Clone)]
pub struct MemTableSnapshot {
    cfs: HashMap<String, Arc<CfMap>>,
}

impl MemTableSnapshot {
    /// Contents of a column family
    pub fn cf(&self, cf: &str) -> Result<&Arc<CfMap>> {
        self.cfs
            .get(cf)
            .ok_or_else(|| CfkvError::ColumnFamilyNotFound(cf.to_string()))
    }

    /// Look up a key; `Ok(None)` when absent
    pub fn get(&self, cf: &str, key: &[u8]) -> Result<Option<ValueSlot>> {
        Ok(self.cf(cf)?.get(key).cloned())
    }
}
