use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::meta::{Labels, ObjectMeta};

/// A resource kind managed by the registry.
///
/// The associated constants form the kind descriptor: everything the
/// registry needs to key, type-check and gate operations for the kind is
/// known at compile time.
pub trait Resource: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type tag written into every encoded payload, e.g. `"Deployment"`.
    const KIND: &'static str;

    /// Kind name used in diagnostics and errors, e.g. `"deploymentConfig"`.
    const NAME: &'static str;

    /// Store namespace holding every resource of this kind, e.g. `"/deployments"`.
    ///
    /// The literal is part of the on-disk layout and must never change.
    const PREFIX: &'static str;

    /// Whether the registry accepts in-place updates for this kind.
    const UPDATABLE: bool = true;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn labels(&self) -> &Labels {
        &self.meta().labels
    }

    fn resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }
}
