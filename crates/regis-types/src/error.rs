use thiserror::Error;

/// Errors produced while encoding or decoding resource payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no kind tag")]
    MissingKind,

    #[error("unexpected kind: expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("{kind} did not encode to a JSON object")]
    NotAnObject { kind: &'static str },
}

impl CodecError {
    /// Returns `true` if the payload decoded but carried a different kind.
    pub fn is_kind_mismatch(&self) -> bool {
        matches!(self, Self::KindMismatch { .. })
    }
}
