use regis_store::{is_under, StoreError, StoreResult};
use regis_types::Resource;

/// Store key for the resource `id` under the namespace `prefix`.
pub fn make_key(prefix: &str, id: &str) -> String {
    format!("{prefix}/{id}")
}

/// Store key for the resource `id` of kind `K`.
pub fn key_for<K: Resource>(id: &str) -> String {
    make_key(K::PREFIX, id)
}

/// Store key a resource `id` of kind `K` is written to.
///
/// Fails with `InvalidKey` unless the key names a record strictly inside the
/// kind's namespace, so that every written record is also listed and watched.
pub fn record_key<K: Resource>(id: &str) -> StoreResult<String> {
    let key = key_for::<K>(id);
    if !is_under(K::PREFIX, &key) || key.ends_with('/') {
        return Err(StoreError::InvalidKey { key });
    }
    Ok(key)
}
