//! Write batches
//!
//! A batch is an ordered list of modifications applied as one unit.

use bytes::Bytes;

/// A single modification inside a write batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modify {
    /// Insert or replace `key` in `cf`
    Put { cf: String, key: Bytes, value: Bytes },

    /// Remove `key` from `cf`; a no-op if the key is absent
    Delete { cf: String, key: Bytes },
}

impl Modify {
    /// Column family this modification targets
    pub fn cf(&self) -> &str {
        match self {
            Modify::Put { cf, .. } | Modify::Delete { cf, .. } => cf,
        }
    }

    /// Key this modification targets
    pub fn key(&self) -> &[u8] {
        match self {
            Modify::Put { key, .. } | Modify::Delete { key, .. } => key,
        }
    }
}

/// Ordered modifications submitted to a storage engine in one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    modifies: Vec<Modify>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a put
    pub fn put(&mut self, cf: impl Into<String>, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.modifies.push(Modify::Put {
            cf: cf.into(),
            key: key.into(),
            value: value.into(),
        });
    }

    /// Append a delete
    pub fn delete(&mut self, cf: impl Into<String>, key: impl Into<Bytes>) {
        self.modifies.push(Modify::Delete {
            cf: cf.into(),
            key: key.into(),
        });
    }

    pub fn push(&mut self, modify: Modify) {
        self.modifies.push(modify);
    }

    pub fn len(&self) -> usize {
        self.modifies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifies.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Modify> {
        self.modifies.iter()
    }
}

impl From<Vec<Modify>> for WriteBatch {
    fn from(modifies: Vec<Modify>) -> Self {
        Self { modifies }
    }
}

impl IntoIterator for WriteBatch {
    type Item = Modify;
    type IntoIter = std::vec::IntoIter<Modify>;

    fn into_iter(self) -> Self::IntoIter {
        self.modifies.into_iter()
    }
}
