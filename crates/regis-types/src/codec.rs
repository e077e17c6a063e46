//! JSON payload codec.
//!
//! Encoded payloads are JSON objects tagged with a top-level `"kind"` field so
//! a decoder can tell which resource kind a record holds before committing to
//! a concrete type. The resource version lives in the store, never in the
//! payload, so it is stripped on encode.

use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::resource::Resource;

const KIND_FIELD: &str = "kind";
const METADATA_FIELD: &str = "metadata";
const RESOURCE_VERSION_FIELD: &str = "resourceVersion";

/// Encode a resource into its tagged JSON payload.
pub fn encode<K: Resource>(object: &K) -> Result<Vec<u8>, CodecError> {
    let mut value = serde_json::to_value(object)?;
    let Value::Object(map) = &mut value else {
        return Err(CodecError::NotAnObject { kind: K::KIND });
    };
    map.insert(KIND_FIELD.to_string(), Value::String(K::KIND.to_string()));
    if let Some(Value::Object(meta)) = map.get_mut(METADATA_FIELD) {
        meta.remove(RESOURCE_VERSION_FIELD);
    }
    Ok(serde_json::to_vec(&value)?)
}

/// Decode a payload that must hold a resource of kind `K`.
pub fn decode<K: Resource>(data: &[u8]) -> Result<K, CodecError> {
    RawObject::decode(data)?.into_typed()
}

/// A decoded payload whose kind tag has not been checked yet.
#[derive(Clone, Debug, PartialEq)]
pub struct RawObject {
    kind: String,
    fields: Map<String, Value>,
}

impl RawObject {
    /// Parse a payload far enough to read its kind tag.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut fields: Map<String, Value> = serde_json::from_slice(data)?;
        let kind = match fields.remove(KIND_FIELD) {
            Some(Value::String(kind)) => kind,
            _ => return Err(CodecError::MissingKind),
        };
        Ok(Self { kind, fields })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns `true` if the payload carries the tag of kind `K`.
    pub fn is<K: Resource>(&self) -> bool {
        self.kind == K::KIND
    }

    /// Convert into a concrete resource, failing if the kind tag differs.
    pub fn into_typed<K: Resource>(self) -> Result<K, CodecError> {
        if !self.is::<K>() {
            return Err(CodecError::KindMismatch {
                expected: K::KIND,
                found: self.kind,
            });
        }
        Ok(serde_json::from_value(Value::Object(self.fields))?)
    }
}
