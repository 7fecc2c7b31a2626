#![forbid(unsafe_code)]

use thiserror::Error;

use crate::fingerprint::Fingerprint;
use crate::value::ValueKind;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by store operations.
///
/// Every variant is recoverable: a failed operation leaves the store in a
/// defined state and no observer has been notified for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: &'static str },

    #[error("variable {id} not found")]
    NotFound { id: Fingerprint },

    #[error("variable {id} already exists")]
    AlreadyExists { id: Fingerprint },

    #[error("store is disabled")]
    Disabled,

    #[error("cannot allocate {requested} bytes for variable {id}")]
    AllocationFailure { id: Fingerprint, requested: usize },

    #[error("variable {id} holds {actual}, not {expected}")]
    KindMismatch {
        id: Fingerprint,
        expected: ValueKind,
        actual: ValueKind,
    },
}

impl StoreError {
    #[must_use]
    pub(crate) const fn invalid(message: &'static str) -> Self {
        Self::InvalidArgument { message }
    }

    /// Whether the error came from a missing variable.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
