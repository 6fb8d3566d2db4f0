use std::path::PathBuf;

use thiserror::Error;

use super::model::Column;

/// A submission that cannot be stored. Nothing is written when this occurs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("at least one field must be filled in")]
    EmptySubmission,

    #[error("{column}: '{input}' is not a valid number")]
    InvalidNumber { column: Column, input: String },

    #[error("{column}: value has the wrong type for this column")]
    TypeMismatch { column: Column },

    #[error("{column} is not part of the dataset schema")]
    UnknownColumn { column: Column },
}

/// Errors surfaced by [`DatasetStore`](super::store::DatasetStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Any I/O or decoding failure other than "file not found" on load.
    #[error("storage error at {}: {source:#}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported dataset file type: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
}

impl StoreError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: anyhow::Error) -> Self {
        StoreError::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
