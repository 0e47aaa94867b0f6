//! Error types for the catalog.

use crate::types::{EntityKind, ObjectId};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a storage collection.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{operation} on `{collection}` exceeded its {budget:?} deadline")]
    Timeout {
        collection: String,
        operation: &'static str,
        budget: Duration,
    },

    #[error("{operation} on `{collection}` was cancelled by the caller")]
    Cancelled {
        collection: String,
        operation: &'static str,
    },

    #[error("Duplicate key: {0}")]
    DuplicateKey(ObjectId),

    #[error("Collection `{0}` has no text index")]
    NoTextIndex(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// True when the call ran out of its deadline budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Timeout { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Main error type for catalog operations.
///
/// "Nothing found" on a list or search is not an error; it is reported
/// through [`crate::PageStatus::NoDocuments`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{kind} not found matching {filter}")]
    NotFound { kind: EntityKind, filter: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} persistence failure: {source}")]
    Persistence {
        kind: EntityKind,
        #[source]
        source: StorageError,
    },

    #[error("Search failed for both recipes ({recipes}) and ingredients ({ingredients})")]
    AggregateSearch {
        recipes: Box<CatalogError>,
        ingredients: Box<CatalogError>,
    },
}

impl CatalogError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CatalogError::InvalidArgument(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CatalogError::InvalidArgument(_))
    }

    /// True for a persistence failure caused by an expired deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CatalogError::Persistence { source, .. } if source.is_timeout())
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
