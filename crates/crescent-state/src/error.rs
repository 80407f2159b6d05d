//! Error types for the Crescent store.

use thiserror::Error;

use crate::events::EventStatus;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    /// redb failed while performing `op`.
    #[error("store {op} failed: {message}")]
    Storage { op: &'static str, message: String },

    /// A record could not be encoded, or a stored record no longer decodes.
    #[error("{record} record codec error: {message}")]
    Codec { record: &'static str, message: String },

    #[error("invalid tenant id {0:?}: must be non-empty and use only letters, digits, '-', '_' or '.'")]
    InvalidTenant(String),

    #[error("approver name must not be empty")]
    MissingApprover,

    #[error("no scaling event with key {0:?}")]
    EventNotFound(String),

    #[error("scaling event {key:?} is already {status}")]
    AlreadyDecided { key: String, status: EventStatus },
}

/// Error factory for a failed redb call.
pub(crate) fn storage<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StateError {
    move |e| StateError::Storage {
        op,
        message: e.to_string(),
    }
}

/// Error factory for a JSON encode/decode failure on `record`.
pub(crate) fn codec<E: std::fmt::Display>(record: &'static str) -> impl FnOnce(E) -> StateError {
    move |e| StateError::Codec {
        record,
        message: e.to_string(),
    }
}
