//! Error types shared by every component of the coordination server.
//!
//! [`StoreError`] is the low-level I/O error surfaced by [`crate::store`].
//! [`CoordError`] is the closed taxonomy from the outward command surface
//! (spec §7): every domain error — store failures included — is mapped into
//! one of its [`ErrKind`] variants before it reaches a caller.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the on-disk store (locking, atomic writes, JSON I/O).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to acquire lock on {path} after {retries} retries")]
    LockTimeout { path: PathBuf, retries: u32 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid path: {path}")]
    InvalidPath { path: PathBuf },
}

/// The closed error taxonomy exposed at the tool-call surface.
///
/// Every variant maps 1:1 to the `kind` field of the `{ error: { kind,
/// message } }` envelope returned by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrKind {
    InvalidArg,
    InvalidName,
    NotFound,
    Exists,
    Busy,
    Cycle,
    UnknownTemplate,
    IllegalTransition,
    Spawn,
    Storage,
    Timeout,
}

/// A domain error carrying one [`ErrKind`] and a human-readable message.
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CoordError {
    pub kind: ErrKind,
    pub message: String,
}

impl CoordError {
    pub fn new(kind: ErrKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_arg(message: impl Into<String>) -> Self {
        Self::new(ErrKind::InvalidArg, message)
    }

    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::new(ErrKind::InvalidName, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrKind::NotFound, message)
    }

    pub fn exists(message: impl Into<String>) -> Self {
        Self::new(ErrKind::Exists, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ErrKind::Busy, message)
    }

    pub fn cycle(message: impl Into<String>) -> Self {
        Self::new(ErrKind::Cycle, message)
    }

    pub fn unknown_template(message: impl Into<String>) -> Self {
        Self::new(ErrKind::UnknownTemplate, message)
    }

    pub fn illegal_transition(message: impl Into<String>) -> Self {
        Self::new(ErrKind::IllegalTransition, message)
    }

    pub fn spawn(message: impl Into<String>) -> Self {
        Self::new(ErrKind::Spawn, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrKind::Storage, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrKind::Timeout, message)
    }
}

impl From<StoreError> for CoordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout { .. } => CoordError::timeout(err.to_string()),
            other => CoordError::storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_lock_timeout_maps_to_timeout_kind() {
        let err = StoreError::LockTimeout {
            path: PathBuf::from("/tmp/x.lock"),
            retries: 5,
        };
        let coord: CoordError = err.into();
        assert_eq!(coord.kind, ErrKind::Timeout);
    }

    #[test]
    fn store_io_error_maps_to_storage_kind() {
        let err = StoreError::Io {
            path: PathBuf::from("/tmp/x.json"),
            source: std::io::Error::other("boom"),
        };
        let coord: CoordError = err.into();
        assert_eq!(coord.kind, ErrKind::Storage);
    }
}
