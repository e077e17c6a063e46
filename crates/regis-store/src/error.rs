use regis_types::CodecError;

/// Errors from backing store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists at the key.
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    /// A create-only write found an existing record.
    #[error("key already exists: {key}")]
    NodeExist { key: String },

    /// The key cannot hold a record: it is empty or names a directory.
    #[error("invalid key: {key:?}")]
    InvalidKey { key: String },

    /// A conditional write lost against a concurrent modification.
    #[error("compare failed for {key}: expected index {expected}, current {current}")]
    TestFailed {
        key: String,
        expected: u64,
        current: u64,
    },

    /// The requested watch index is older than the retained history.
    #[error("watch index {requested} has been cleared, oldest retained index is {oldest}")]
    IndexCleared { requested: u64, oldest: u64 },

    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Store configuration is invalid.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// The store cannot serve the request right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    pub fn is_node_exist(&self) -> bool {
        matches!(self, Self::NodeExist { .. })
    }

    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Self::InvalidKey { .. })
    }

    pub fn is_test_failed(&self) -> bool {
        matches!(self, Self::TestFailed { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
