//! Deadline-bounded, projection-aware CRUD and search over one entity kind.

use crate::context::{Deadline, RequestContext};
use crate::error::{CatalogError, Result, StorageError};
use crate::gateway::{Assembler, Entity, Page, PageRequest, QueryBudgets};
use crate::storage::{
    top_level, Collection, Document, Filter, FindOptions, Projection, Stage, StorageResult,
    ID_FIELD,
};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Gateway between callers and one storage collection.
///
/// Every storage call gets its own deadline: the operation's budget, cut
/// short by the caller's deadline when that is earlier. Point lookups that
/// match nothing fail with `NotFound`; listings and searches that match
/// nothing return a page flagged `NoDocuments`.
pub struct Gateway<E: Entity> {
    collection: Arc<dyn Collection>,
    budgets: QueryBudgets,
    assembler: Assembler,
    max_page_size: usize,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Gateway<E> {
    pub fn new(
        collection: Arc<dyn Collection>,
        budgets: QueryBudgets,
        assembler: Assembler,
        max_page_size: usize,
    ) -> Self {
        Self {
            collection,
            budgets,
            assembler,
            max_page_size: max_page_size.max(1),
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &Arc<dyn Collection> {
        &self.collection
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    // --- Writes ---

    /// Validate, derive slugs and insert one entity.
    pub fn create(&self, ctx: &RequestContext, input: E::New) -> Result<E> {
        let mut entity = E::build(input, &self.assembler)?;
        let doc = self.encode(&entity)?;

        let id = self.run(ctx, "insert_one", self.budgets.write, |col, deadline| {
            col.insert_one(doc, deadline)
        })?;
        entity.set_id(id);

        debug!(kind = %E::KIND, %id, slug = entity.slug(), "created");
        Ok(entity)
    }

    /// Insert a batch with one storage call. Every element is validated before
    /// the call; the batch is stored entirely or not at all.
    pub fn bulk_create(&self, ctx: &RequestContext, inputs: Vec<E::New>) -> Result<Vec<E>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut entities = inputs
            .into_iter()
            .map(|input| E::build(input, &self.assembler))
            .collect::<Result<Vec<_>>>()?;
        let docs = entities
            .iter()
            .map(|entity| self.encode(entity))
            .collect::<Result<Vec<_>>>()?;

        let budget = self.budgets.bulk(entities.len());
        let ids = self.run(ctx, "insert_many", budget, |col, deadline| {
            col.insert_many(docs, deadline)
        })?;
        for (entity, id) in entities.iter_mut().zip(ids) {
            entity.set_id(id);
        }

        debug!(kind = %E::KIND, count = entities.len(), "bulk created");
        Ok(entities)
    }

    /// Replace the mutable fields of an existing entity, re-deriving slugs.
    pub fn update(&self, ctx: &RequestContext, input: E::Update) -> Result<E> {
        let (id, mut entity) = E::rebuild(input, &self.assembler)?;
        let doc = self.encode(&entity)?;

        let result = self.run(ctx, "update_by_id", self.budgets.write, |col, deadline| {
            col.update_by_id(id, doc, deadline)
        })?;
        if result.matched == 0 {
            return Err(self.not_found(&Filter::by_id(id)));
        }
        entity.set_id(id);

        debug!(kind = %E::KIND, %id, modified = result.modified, "updated");
        Ok(entity)
    }

    /// Delete by identity. Deleting an identity that does not exist succeeds;
    /// the return value tells whether anything was removed.
    pub fn delete(&self, ctx: &RequestContext, filter: &Filter) -> Result<bool> {
        let filter = filter.normalized()?;
        let Some(id) = filter.identity()? else {
            return Err(CatalogError::invalid(format!(
                "deleting a {} requires an `{ID_FIELD}` filter",
                E::KIND
            )));
        };

        let result = self.run(ctx, "delete_one", self.budgets.write, |col, deadline| {
            col.delete_one(&filter, deadline)
        })?;

        debug!(kind = %E::KIND, %id, deleted = result.deleted, "delete");
        Ok(result.deleted > 0)
    }

    // --- Reads ---

    /// Fetch one entity by identity or by any field filter.
    pub fn get(&self, ctx: &RequestContext, filter: &Filter) -> Result<E> {
        let filter = filter.normalized()?;
        self.check_projection(&ctx.projection)?;

        let doc = self.run(ctx, "find_one", self.budgets.read, |col, deadline| {
            col.find_one(&filter, &ctx.projection, deadline)
        })?;
        match doc {
            Some(doc) => self.decode(doc),
            None => Err(self.not_found(&filter)),
        }
    }

    /// One page of entities matching `filter`, in creation order.
    pub fn list(&self, ctx: &RequestContext, filter: &Filter, request: PageRequest) -> Result<Page<E>> {
        let filter = filter.normalized()?;
        self.check_projection(&ctx.projection)?;

        let (skip, limit) = request.resolve(self.max_page_size);
        let options = FindOptions {
            projection: ctx.projection.clone(),
            skip,
            limit: Some(limit),
        };
        let docs = self.run(ctx, "find_many", self.budgets.list, |col, deadline| {
            col.find_many(&filter, &options, deadline)
        })?;

        self.page(docs, request)
    }

    /// One page of full-text matches, best match first.
    pub fn search(&self, ctx: &RequestContext, query: &str, request: PageRequest) -> Result<Page<E>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::invalid("search query must not be blank"));
        }
        self.check_projection(&ctx.projection)?;

        let (skip, limit) = request.resolve(self.max_page_size);
        let pipeline = [
            Stage::TextSearch(query.to_string()),
            Stage::Skip(skip),
            Stage::Limit(limit),
            Stage::Project(ctx.projection.clone()),
        ];
        let docs = self.run(ctx, "aggregate", self.budgets.search, |col, deadline| {
            col.aggregate(&pipeline, deadline)
        })?;

        self.page(docs, request)
    }

    /// Every entity matching `filter`, fetched page by page.
    pub fn scan(&self, ctx: &RequestContext, filter: &Filter) -> Result<Vec<E>> {
        let mut all = Vec::new();
        for page in 0.. {
            let batch = self.list(ctx, filter, PageRequest::new(self.max_page_size, page))?;
            let done = batch.len() < self.max_page_size;
            all.extend(batch.into_items());
            if done {
                break;
            }
        }
        Ok(all)
    }

    // --- Helpers ---

    /// Issue one storage call under its own deadline.
    fn run<T>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        budget: Duration,
        call: impl FnOnce(&dyn Collection, Deadline) -> StorageResult<T>,
    ) -> Result<T> {
        let collection = self.collection.name();
        if ctx.is_cancelled() {
            return Err(self.persistence(StorageError::Cancelled {
                collection: collection.to_string(),
                operation,
            }));
        }

        let deadline = ctx.deadline_for(budget);
        let started = Instant::now();
        match call(self.collection.as_ref(), deadline) {
            Ok(value) => {
                debug!(kind = %E::KIND, collection, operation, elapsed = ?started.elapsed(), "storage call");
                Ok(value)
            }
            Err(source) => {
                warn!(
                    kind = %E::KIND,
                    collection,
                    operation,
                    elapsed = ?started.elapsed(),
                    error = %source,
                    "storage call failed"
                );
                Err(self.persistence(source))
            }
        }
    }

    fn page(&self, docs: Vec<Document>, request: PageRequest) -> Result<Page<E>> {
        let items = docs
            .into_iter()
            .map(|doc| self.decode(doc))
            .collect::<Result<Vec<_>>>()?;
        let page = Page::new(items, request);
        if page.is_no_documents() {
            debug!(kind = %E::KIND, page = request.page, "no documents");
        }
        Ok(page)
    }

    fn check_projection(&self, projection: &Projection) -> Result<()> {
        for field in projection.fields() {
            let top = top_level(field);
            if !E::FIELDS.iter().any(|known| *known == top) {
                return Err(CatalogError::invalid(format!(
                    "unknown {} field `{field}` in projection",
                    E::KIND
                )));
            }
        }
        Ok(())
    }

    /// Serialize for storage. The identity is storage-assigned, so it is stripped.
    fn encode(&self, entity: &E) -> Result<Document> {
        match serde_json::to_value(entity) {
            Ok(Value::Object(mut doc)) => {
                doc.remove(ID_FIELD);
                Ok(doc)
            }
            Ok(other) => Err(self.persistence(StorageError::Serialization(format!(
                "{} encoded as a non-object: {other}",
                E::KIND
            )))),
            Err(e) => Err(self.persistence(e.into())),
        }
    }

    fn decode(&self, doc: Document) -> Result<E> {
        serde_json::from_value(Value::Object(doc))
            .map_err(|e| self.persistence(StorageError::MalformedDocument(e.to_string())))
    }

    fn persistence(&self, source: StorageError) -> CatalogError {
        CatalogError::Persistence {
            kind: E::KIND,
            source,
        }
    }

    fn not_found(&self, filter: &Filter) -> CatalogError {
        CatalogError::NotFound {
            kind: E::KIND,
            filter: filter.to_string(),
        }
    }
}
