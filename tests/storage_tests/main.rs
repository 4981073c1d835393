//! Storage Engine Tests
//!
//! Both engines are checked against the same reader/iterator/batch
//! contract; the standalone engine additionally for durability.


use cfkv::protocol::Context;
use cfkv::storage::DbIterator;
use cfkv::{Storage, StorageReader, WriteBatch};

// =============================================================================
// Shared Helpers
// =============================================================================

pub fn ctx() -> Context {
    Context::default()
}

pub fn put_one<S: Storage>(storage: &S, cf: &str, key: &[u8], value: &[u8]) {
    let mut batch = WriteBatch::new();
    batch.put(cf, key.to_vec(), value.to_vec());
    storage.write(&ctx(), batch).unwrap();
}

pub fn get_one<S: Storage>(storage: &S, cf: &str, key: &[u8]) -> Option<Vec<u8>> {
    let reader = storage.reader(&ctx()).unwrap();
    reader.get_cf(cf, key).unwrap().map(|v| v.to_vec())
}

/// Drain an iterator from `start`, returning (key, value) pairs
pub fn collect_from(iter: &mut dyn DbIterator, start: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut pairs = Vec::new();
    iter.seek(start);
    while iter.valid() {
        let item = iter.item().unwrap();
        pairs.push((item.key().to_vec(), item.value().unwrap().to_vec()));
        iter.next();
    }
    pairs
}
