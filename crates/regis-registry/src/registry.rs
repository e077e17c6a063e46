//! Generic typed registry over a [`KeyValueStore`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use regis_store::{KeyValueStore, StoreResult, StoredRecord};
use regis_types::{decode, encode, LabelSelector, Resource};
use tracing::debug;

use crate::cursor::WatchCursor;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{translate, Operation, RegistryError, RegistryResult};
use crate::filter::filter_by_selector;
use crate::key::{key_for, record_key};
use crate::watch::{WatchPredicate, WatchStream};

/// CRUD, selector listing and resumable watch for one resource kind.
///
/// The registry holds no state besides its handles: every call goes to the
/// store, and every returned object carries the version the store assigned
/// to it. Handles are cheap to clone and safe to share between tasks.
pub struct Registry<K, S: ?Sized> {
    store: Arc<S>,
    sink: Arc<dyn DiagnosticSink>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S: ?Sized> Clone for Registry<K, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
            _kind: PhantomData,
        }
    }
}

impl<K, S> Registry<K, S>
where
    K: Resource,
    S: KeyValueStore + ?Sized,
{
    /// Registry whose dropped watch payloads are logged through `tracing`.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_diagnostics(store, Arc::new(TracingSink))
    }

    pub fn with_diagnostics(store: Arc<S>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            store,
            sink,
            _kind: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Every stored resource of kind `K` matching `selector`, in store order.
    ///
    /// Store and decode failures are returned as they are.
    pub fn list<L>(&self, selector: &L) -> RegistryResult<Vec<K>>
    where
        L: LabelSelector + ?Sized,
    {
        let records = self.store.extract_all(K::PREFIX)?;
        let items = records
            .into_iter()
            .map(read_record::<K>)
            .collect::<StoreResult<Vec<K>>>()?;
        let total = items.len();
        let items = filter_by_selector(items, selector);
        debug!(
            op = %Operation::List,
            kind = K::NAME,
            total,
            matched = items.len(),
            "listed resources"
        );
        Ok(items)
    }

    /// The resource `id`, or `NotFound`.
    pub fn get(&self, id: &str) -> RegistryResult<K> {
        let outcome = self
            .store
            .extract_one(&key_for::<K>(id))
            .and_then(read_record::<K>);
        translate(outcome, Operation::Get, K::NAME, id)
    }

    /// Store a new resource. Fails with `AlreadyExists` if the id is taken,
    /// and with `Internal` if the id does not name a record in the kind's
    /// namespace (for example the empty id).
    pub fn create(&self, object: &K) -> RegistryResult<K> {
        let id = object.id();
        let outcome = record_key::<K>(id).and_then(|key| {
            let data = encode(object)?;
            self.store.create_only(&key, data)
        });
        let version = translate(outcome, Operation::Create, K::NAME, id)?;
        debug!(kind = K::NAME, id, version, "resource created");
        Ok(stamped(object, version))
    }

    /// Overwrite the stored resource with `object`, creating it if absent.
    ///
    /// The write is unconditional; a version carried by `object` is ignored.
    /// Kinds that are not updatable fail with `Unsupported` without touching
    /// the store.
    pub fn update(&self, object: &K) -> RegistryResult<K> {
        let id = object.id();
        if !K::UPDATABLE {
            return Err(RegistryError::Unsupported {
                op: Operation::Update,
                kind: K::NAME,
                id: id.to_string(),
            });
        }
        let outcome = record_key::<K>(id).and_then(|key| {
            let data = encode(object)?;
            self.store.set(&key, data)
        });
        let version = translate(outcome, Operation::Update, K::NAME, id)?;
        debug!(kind = K::NAME, id, version, "resource updated");
        Ok(stamped(object, version))
    }

    /// Remove the resource `id`. Only that key is removed.
    pub fn delete(&self, id: &str) -> RegistryResult<()> {
        let outcome = self.store.delete(&key_for::<K>(id), false);
        translate(outcome, Operation::Delete, K::NAME, id)?;
        debug!(kind = K::NAME, id, "resource deleted");
        Ok(())
    }

    /// Watch changes to resources of kind `K` that satisfy `predicate`.
    ///
    /// `resource_version` is the last version the caller has seen: `""` or
    /// `"0"` starts from now, `"N"` delivers every change with a version
    /// greater than `N`.
    pub fn watch<F>(&self, resource_version: &str, predicate: F) -> RegistryResult<WatchStream<K>>
    where
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        let cursor = WatchCursor::parse(resource_version, K::NAME)?;
        let raw = self.store.watch(K::PREFIX, cursor.since())?;
        debug!(kind = K::NAME, since = cursor.since(), "watch started");
        let predicate: WatchPredicate<K> = Box::new(predicate);
        Ok(WatchStream::new(raw, predicate, Arc::clone(&self.sink)))
    }

    /// Watch every change to resources of kind `K`.
    pub fn watch_all(&self, resource_version: &str) -> RegistryResult<WatchStream<K>> {
        self.watch(resource_version, |_| true)
    }
}

impl<K: Resource, S: ?Sized> fmt::Debug for Registry<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &K::NAME)
            .field("prefix", &K::PREFIX)
            .finish()
    }
}

fn read_record<K: Resource>(record: StoredRecord) -> StoreResult<K> {
    let mut object: K = decode(&record.data)?;
    object.meta_mut().resource_version = Some(record.version.to_string());
    Ok(object)
}

fn stamped<K: Resource>(object: &K, version: u64) -> K {
    let mut out = object.clone();
    out.meta_mut().resource_version = Some(version.to_string());
    out
}
