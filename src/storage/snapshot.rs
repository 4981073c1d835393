//! Snapshot reader and iterator
//!
//! Both engines read through a MemTable snapshot; they differ only in how
//! value slots are resolved.

use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{CfkvError, Result};
use crate::memtable::{CfMap, MemTableSnapshot, ValueSlot};

use super::{DbItem, DbIterator, StorageReader, ValueResolver};

/// Reader over a MemTable snapshot
///
/// Holds the snapshot until closed or dropped.
pub struct SnapshotReader {
    snapshot: Option<MemTableSnapshot>,
    values: Arc<dyn ValueResolver>,
}

impl SnapshotReader {
    pub(crate) fn new(snapshot: MemTableSnapshot, values: Arc<dyn ValueResolver>) -> Self {
        Self {
            snapshot: Some(snapshot),
            values,
        }
    }

    /// Check if the snapshot has been released
    pub fn is_closed(&self) -> bool {
        self.snapshot.is_none()
    }
}

impl StorageReader for SnapshotReader {
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Bytes>> {
        let snapshot = self.snapshot.as_ref().ok_or(CfkvError::ReaderClosed)?;
        match snapshot.get(cf, key)? {
            Some(slot) => self.values.resolve(&slot).map(Some),
            None => Ok(None),
        }
    }

    fn iter_cf(&self, cf: &str) -> Box<dyn DbIterator + '_> {
        let source = match &self.snapshot {
            Some(snapshot) => match snapshot.cf(cf) {
                Ok(map) => IterSource::Map(Arc::clone(map)),
                Err(_) => IterSource::UnknownCf(cf.to_string()),
            },
            None => IterSource::Closed,
        };

        Box::new(SnapshotIterator {
            source,
            values: Arc::clone(&self.values),
            current: None,
        })
    }

    fn close(&mut self) {
        if self.snapshot.take().is_some() {
            tracing::trace!("Released reader snapshot");
        }
    }
}

impl Drop for SnapshotReader {
    fn drop(&mut self) {
        self.close();
    }
}

enum IterSource {
    Map(Arc<CfMap>),
    UnknownCf(String),
    Closed,
}

/// Cursor over one column family of a snapshot
pub struct SnapshotIterator {
    source: IterSource,
    values: Arc<dyn ValueResolver>,
    current: Option<SnapshotItem>,
}

impl SnapshotIterator {
    fn position(&mut self, lower: Bound<&[u8]>) {
        self.current = match &self.source {
            IterSource::Map(map) => map
                .range::<[u8], _>((lower, Bound::Unbounded))
                .next()
                .map(|(key, slot)| SnapshotItem {
                    key: key.clone(),
                    slot: slot.clone(),
                    values: Arc::clone(&self.values),
                }),
            IterSource::UnknownCf(_) | IterSource::Closed => None,
        };
    }
}

impl DbIterator for SnapshotIterator {
    fn seek(&mut self, key: &[u8]) {
        self.position(Bound::Included(key));
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) {
        if let Some(current) = self.current.take() {
            self.position(Bound::Excluded(current.key.as_ref()));
        }
    }

    fn item(&self) -> Option<&dyn DbItem> {
        self.current.as_ref().map(|item| item as &dyn DbItem)
    }

    fn status(&self) -> Result<()> {
        match &self.source {
            IterSource::Map(_) => Ok(()),
            IterSource::UnknownCf(cf) => Err(CfkvError::ColumnFamilyNotFound(cf.clone())),
            IterSource::Closed => Err(CfkvError::ReaderClosed),
        }
    }
}

struct SnapshotItem {
    key: Bytes,
    slot: ValueSlot,
    values: Arc<dyn ValueResolver>,
}

impl DbItem for SnapshotItem {
    fn key(&self) -> &[u8] {
        &self.key
    }

    fn value(&self) -> Result<Bytes> {
        self.values.resolve(&self.slot)
    }
}
