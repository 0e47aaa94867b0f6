//! The document collection contract the gateway talks to.

use crate::context::Deadline;
use crate::error::StorageError;
use crate::storage::{Filter, Projection};
use crate::types::ObjectId;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Result type for collection calls.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Options for [`Collection::find_many`].
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub projection: Projection,
    pub skip: usize,
    /// `None` returns every remaining match.
    pub limit: Option<usize>,
}

/// One stage of an aggregation pipeline.
#[derive(Clone, Debug)]
pub enum Stage {
    /// Full-text match against the collection's text index; orders by score.
    TextSearch(String),
    Skip(usize),
    Limit(usize),
    Project(Projection),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted: u64,
}

/// A generic document collection.
///
/// Every call is bounded by the caller-supplied deadline. An empty match is
/// never an error: `find_one` yields `None`, the others an empty result.
/// Documents are returned in identity (creation) order unless a text search
/// stage reorders them.
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Insert a document; the identity is assigned unless the document carries one.
    fn insert_one(&self, doc: Document, deadline: Deadline) -> StorageResult<ObjectId>;

    /// Insert a batch atomically: either every document is stored or none is.
    fn insert_many(&self, docs: Vec<Document>, deadline: Deadline) -> StorageResult<Vec<ObjectId>>;

    fn find_one(
        &self,
        filter: &Filter,
        projection: &Projection,
        deadline: Deadline,
    ) -> StorageResult<Option<Document>>;

    fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
        deadline: Deadline,
    ) -> StorageResult<Vec<Document>>;

    /// Set the given top-level fields on the document with this identity.
    fn update_by_id(
        &self,
        id: ObjectId,
        changes: Document,
        deadline: Deadline,
    ) -> StorageResult<UpdateResult>;

    /// Delete the first document matching the filter.
    fn delete_one(&self, filter: &Filter, deadline: Deadline) -> StorageResult<DeleteResult>;

    fn aggregate(&self, pipeline: &[Stage], deadline: Deadline) -> StorageResult<Vec<Document>>;
}
