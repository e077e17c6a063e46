use regis_types::EventType;

/// A record as held by the store: key, encoded payload, and version.
///
/// The version is the store index of the last mutation of this key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: String,
    pub data: Vec<u8>,
    pub version: u64,
}

impl StoredRecord {
    pub fn new(key: impl Into<String>, data: Vec<u8>, version: u64) -> Self {
        Self {
            key: key.into(),
            data,
            version,
        }
    }
}

/// An undecoded change delivered by a store watch.
///
/// For `Deleted`, `record.data` is the last stored payload and
/// `record.version` is the index of the deletion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: EventType,
    pub record: StoredRecord,
}

/// Returns `true` if `key` lies strictly under the namespace `prefix`.
pub fn is_under(prefix: &str, key: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_membership() {
        assert!(is_under("/images", "/images/abc"));
        assert!(is_under("/images", "/images/abc/def"));
        assert!(!is_under("/images", "/images"));
        assert!(!is_under("/images", "/images/"));
        assert!(!is_under("/images", "/imageRepositories/abc"));
        assert!(!is_under("/images", "/imagesx/abc"));
    }
}
