//! Resources and stores shared by the unit tests of this crate.

use regis_store::{KeyValueStore, RawWatch, StoreError, StoreResult, StoredRecord};
use regis_types::{ObjectMeta, Resource};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub size: u32,
}

impl Resource for Widget {
    const KIND: &'static str = "Widget";
    const NAME: &'static str = "widget";
    const PREFIX: &'static str = "/widgets";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// A kind that cannot be updated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gadget {
    pub metadata: ObjectMeta,
}

impl Resource for Gadget {
    const KIND: &'static str = "Gadget";
    const NAME: &'static str = "gadget";
    const PREFIX: &'static str = "/gadgets";
    const UPDATABLE: bool = false;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

pub fn widget(id: &str, size: u32) -> Widget {
    Widget {
        metadata: ObjectMeta::new(id),
        size,
    }
}

pub fn gadget(id: &str) -> Gadget {
    Gadget {
        metadata: ObjectMeta::new(id),
    }
}

/// A store whose every call fails with a scripted error.
pub struct FailingStore {
    error: Box<dyn Fn() -> StoreError + Send + Sync>,
}

impl FailingStore {
    pub fn new(error: impl Fn() -> StoreError + Send + Sync + 'static) -> Self {
        Self {
            error: Box::new(error),
        }
    }

    fn fail<T>(&self) -> StoreResult<T> {
        Err((self.error)())
    }
}

impl KeyValueStore for FailingStore {
    fn extract_all(&self, _prefix: &str) -> StoreResult<Vec<StoredRecord>> {
        self.fail()
    }

    fn extract_one(&self, _key: &str) -> StoreResult<StoredRecord> {
        self.fail()
    }

    fn create_only(&self, _key: &str, _data: Vec<u8>) -> StoreResult<u64> {
        self.fail()
    }

    fn set(&self, _key: &str, _data: Vec<u8>) -> StoreResult<u64> {
        self.fail()
    }

    fn delete(&self, _key: &str, _recursive: bool) -> StoreResult<()> {
        self.fail()
    }

    fn watch(&self, _prefix: &str, _since: u64) -> StoreResult<RawWatch> {
        self.fail()
    }
}
