use std::sync::Arc;

use crate::error::StoreResult;
use crate::record::StoredRecord;
use crate::watch::RawWatch;

/// Hierarchical, versioned key-value store.
///
/// All implementations must satisfy these invariants:
/// - Every mutation is assigned a version greater than any version handed
///   out before it.
/// - Create, read, overwrite and delete are linearizable per key.
/// - Payloads are opaque bytes; the store never interprets them.
/// - Errors are returned as-is, never retried.
pub trait KeyValueStore: Send + Sync {
    /// Every record whose key lies under `prefix`, in enumeration order.
    fn extract_all(&self, prefix: &str) -> StoreResult<Vec<StoredRecord>>;

    /// The record at `key`. Fails with `KeyNotFound` if absent.
    fn extract_one(&self, key: &str) -> StoreResult<StoredRecord>;

    /// Insert a record that must not exist yet. Fails with `NodeExist`
    /// otherwise. Returns the new version.
    fn create_only(&self, key: &str, data: Vec<u8>) -> StoreResult<u64>;

    /// Write a record, overwriting any existing value. Returns the new version.
    fn set(&self, key: &str, data: Vec<u8>) -> StoreResult<u64>;

    /// Remove the record at `key`. With `recursive`, everything under `key`
    /// is removed as well. Fails with `KeyNotFound` if nothing was removed.
    fn delete(&self, key: &str, recursive: bool) -> StoreResult<()>;

    /// Subscribe to every change under `prefix` whose version is at least
    /// `since`. A `since` of zero delivers changes from now on.
    fn watch(&self, prefix: &str, since: u64) -> StoreResult<RawWatch>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn extract_all(&self, prefix: &str) -> StoreResult<Vec<StoredRecord>> {
        (**self).extract_all(prefix)
    }

    fn extract_one(&self, key: &str) -> StoreResult<StoredRecord> {
        (**self).extract_one(key)
    }

    fn create_only(&self, key: &str, data: Vec<u8>) -> StoreResult<u64> {
        (**self).create_only(key, data)
    }

    fn set(&self, key: &str, data: Vec<u8>) -> StoreResult<u64> {
        (**self).set(key, data)
    }

    fn delete(&self, key: &str, recursive: bool) -> StoreResult<()> {
        (**self).delete(key, recursive)
    }

    fn watch(&self, prefix: &str, since: u64) -> StoreResult<RawWatch> {
        (**self).watch(prefix, since)
    }
}
