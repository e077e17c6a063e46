//! Domain error taxonomy and translation of store failures into it.

use std::fmt;

use regis_store::{StoreError, StoreResult};

/// The registry operation an error was produced by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
    Watch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Watch => "watch",
        };
        write!(f, "{s}")
    }
}

/// Errors surfaced by registry operations.
///
/// Per-resource failures carry the operation, the kind name and the id so a
/// caller can report them without looking at store internals.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} \"{id}\" not found")]
    NotFound {
        op: Operation,
        kind: &'static str,
        id: String,
    },

    #[error("{kind} \"{id}\" already exists")]
    AlreadyExists {
        op: Operation,
        kind: &'static str,
        id: String,
    },

    #[error("{op} of {kind} \"{id}\" conflicts with a concurrent modification")]
    Conflict {
        op: Operation,
        kind: &'static str,
        id: String,
    },

    #[error("invalid resource version {version:?} for {kind}: {reason}")]
    InvalidResourceVersion {
        kind: &'static str,
        version: String,
        reason: String,
    },

    #[error("{op} is not supported for {kind} \"{id}\"")]
    Unsupported {
        op: Operation,
        kind: &'static str,
        id: String,
    },

    #[error("{op} of {kind} \"{id}\" failed: {source}")]
    Internal {
        op: Operation,
        kind: &'static str,
        id: String,
        #[source]
        source: StoreError,
    },

    /// A store failure returned untranslated (listing and watch setup).
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_invalid_resource_version(&self) -> bool {
        matches!(self, Self::InvalidResourceVersion { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// The operation that failed, when the error is tagged with one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::NotFound { op, .. }
            | Self::AlreadyExists { op, .. }
            | Self::Conflict { op, .. }
            | Self::Unsupported { op, .. }
            | Self::Internal { op, .. } => Some(*op),
            Self::InvalidResourceVersion { .. } => Some(Operation::Watch),
            Self::Store(_) => None,
        }
    }

    /// The kind name the error refers to, when known.
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { kind, .. }
            | Self::AlreadyExists { kind, .. }
            | Self::Conflict { kind, .. }
            | Self::InvalidResourceVersion { kind, .. }
            | Self::Unsupported { kind, .. }
            | Self::Internal { kind, .. } => Some(*kind),
            Self::Store(_) => None,
        }
    }

    /// The resource id the error refers to, when known.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::NotFound { id, .. }
            | Self::AlreadyExists { id, .. }
            | Self::Conflict { id, .. }
            | Self::Unsupported { id, .. }
            | Self::Internal { id, .. } => Some(id.as_str()),
            Self::InvalidResourceVersion { .. } | Self::Store(_) => None,
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Map a store failure to the domain error for `op` on `kind`/`id`.
///
/// Absence maps to `NotFound` for reads and deletes, an existing key maps to
/// `AlreadyExists` for creates, a failed compare maps to `Conflict` for
/// updates and deletes. Everything else is `Internal`.
pub fn interpret(err: StoreError, op: Operation, kind: &'static str, id: &str) -> RegistryError {
    let id = id.to_string();
    match op {
        Operation::Get | Operation::Delete if err.is_not_found() => {
            RegistryError::NotFound { op, kind, id }
        }
        Operation::Create if err.is_node_exist() => RegistryError::AlreadyExists { op, kind, id },
        Operation::Update | Operation::Delete if err.is_test_failed() => {
            RegistryError::Conflict { op, kind, id }
        }
        _ => RegistryError::Internal {
            op,
            kind,
            id,
            source: err,
        },
    }
}

/// Translate a store outcome. Success passes through unchanged.
pub fn translate<T>(
    result: StoreResult<T>,
    op: Operation,
    kind: &'static str,
    id: &str,
) -> RegistryResult<T> {
    result.map_err(|err| interpret(err, op, kind, id))
}
