use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String labels attached to a resource. Keys are unique.
pub type Labels = BTreeMap<String, String>;

/// Metadata carried by every resource.
///
/// `id` is immutable once the resource is created. `resource_version` is
/// never persisted: the registry stamps it from the store's version whenever
/// a resource is read back or written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub id: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Labels,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ObjectMeta {
    /// Metadata for a new resource with the given id and no labels.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Add a label, replacing any existing value for the key.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Parsed resource version, if one has been stamped.
    pub fn version(&self) -> Option<u64> {
        self.resource_version.as_deref()?.parse().ok()
    }
}
