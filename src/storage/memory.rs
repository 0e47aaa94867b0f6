//! In-process collection backing tests, benchmarks and embedded use.

use crate::context::Deadline;
use crate::error::StorageError;
use crate::storage::filter::{collect_path, ID_FIELD};
use crate::storage::port::{
    Collection, DeleteResult, Document, FindOptions, Stage, StorageResult, UpdateResult,
};
use crate::storage::{Filter, Projection};
use crate::types::ObjectId;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// A collection held in memory, ordered by identity.
///
/// Latency and outages can be injected to exercise deadline and failure paths.
pub struct MemoryCollection {
    name: String,
    documents: RwLock<BTreeMap<ObjectId, Document>>,
    /// Dotted field paths covered by the text index.
    text_fields: Vec<String>,
    latency: Mutex<Duration>,
    unavailable: AtomicBool,
    calls: AtomicU64,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(BTreeMap::new()),
            text_fields: Vec::new(),
            latency: Mutex::new(Duration::ZERO),
            unavailable: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    /// Create a text index over the given dotted field paths.
    pub fn with_text_index<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Delay every call by `latency` before it runs.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Make every call fail with [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of calls issued against this collection.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn begin(&self, operation: &'static str, deadline: &Deadline) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("{} is offline", self.name)));
        }

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            let remaining = deadline.remaining();
            if latency > remaining {
                thread::sleep(remaining);
                return Err(self.timeout(operation, deadline));
            }
            thread::sleep(latency);
        }

        if deadline.is_expired() {
            return Err(self.timeout(operation, deadline));
        }
        Ok(())
    }

    fn timeout(&self, operation: &'static str, deadline: &Deadline) -> StorageError {
        StorageError::Timeout {
            collection: self.name.clone(),
            operation,
            budget: deadline.budget(),
        }
    }

    /// Resolve the identity of a document about to be inserted.
    fn assign_id(doc: &mut Document) -> StorageResult<ObjectId> {
        let id = match doc.get(ID_FIELD) {
            None | Some(Value::Null) => ObjectId::generate(),
            Some(Value::String(s)) => ObjectId::from_hex(s)
                .map_err(|e| StorageError::MalformedDocument(format!("bad identity {s:?}: {e}")))?,
            Some(other) => {
                return Err(StorageError::MalformedDocument(format!(
                    "identity must be a string, got {other}"
                )))
            }
        };
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
        Ok(id)
    }

    fn matching<'a>(
        documents: &'a BTreeMap<ObjectId, Document>,
        filter: &'a Filter,
    ) -> impl Iterator<Item = (&'a ObjectId, &'a Document)> + 'a {
        documents.iter().filter(move |(_, doc)| filter.matches(doc))
    }

    fn text_score(&self, doc: &Document, terms: &HashSet<String>) -> usize {
        let mut score = 0;
        for field in &self.text_fields {
            let path: Vec<&str> = field.split('.').collect();
            let mut values = Vec::new();
            if let Some((head, rest)) = path.split_first() {
                if let Some(value) = doc.get(*head) {
                    collect_path(value, rest, &mut values);
                }
            }
            for text in values.into_iter().filter_map(Value::as_str) {
                score += tokenize(text).filter(|t| terms.contains(t)).count();
            }
        }
        score
    }
}

/// Lowercased alphanumeric tokens.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, mut doc: Document, deadline: Deadline) -> StorageResult<ObjectId> {
        self.begin("insert_one", &deadline)?;
        let id = Self::assign_id(&mut doc)?;

        let mut documents = self.documents.write();
        if documents.contains_key(&id) {
            return Err(StorageError::DuplicateKey(id));
        }
        documents.insert(id, doc);
        Ok(id)
    }

    fn insert_many(&self, docs: Vec<Document>, deadline: Deadline) -> StorageResult<Vec<ObjectId>> {
        self.begin("insert_many", &deadline)?;

        let mut staged = Vec::with_capacity(docs.len());
        let mut seen = HashSet::with_capacity(docs.len());
        for mut doc in docs {
            let id = Self::assign_id(&mut doc)?;
            if !seen.insert(id) {
                return Err(StorageError::DuplicateKey(id));
            }
            staged.push((id, doc));
        }

        // Check the whole batch before writing any of it.
        let mut documents = self.documents.write();
        if let Some((id, _)) = staged.iter().find(|(id, _)| documents.contains_key(id)) {
            return Err(StorageError::DuplicateKey(*id));
        }
        let ids = staged.iter().map(|(id, _)| *id).collect();
        documents.extend(staged);
        Ok(ids)
    }

    fn find_one(
        &self,
        filter: &Filter,
        projection: &Projection,
        deadline: Deadline,
    ) -> StorageResult<Option<Document>> {
        self.begin("find_one", &deadline)?;
        let documents = self.documents.read();
        let found = Self::matching(&documents, filter)
            .next()
            .map(|(_, doc)| projection.apply(doc));
        Ok(found)
    }

    fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
        deadline: Deadline,
    ) -> StorageResult<Vec<Document>> {
        self.begin("find_many", &deadline)?;
        let documents = self.documents.read();
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(Self::matching(&documents, filter)
            .skip(options.skip)
            .take(limit)
            .map(|(_, doc)| options.projection.apply(doc))
            .collect())
    }

    fn update_by_id(
        &self,
        id: ObjectId,
        changes: Document,
        deadline: Deadline,
    ) -> StorageResult<UpdateResult> {
        self.begin("update_by_id", &deadline)?;
        let mut documents = self.documents.write();
        let Some(doc) = documents.get_mut(&id) else {
            return Ok(UpdateResult::default());
        };

        let mut modified = false;
        for (field, value) in changes {
            if field == ID_FIELD {
                continue;
            }
            if doc.get(&field) != Some(&value) {
                doc.insert(field, value);
                modified = true;
            }
        }
        Ok(UpdateResult {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    fn delete_one(&self, filter: &Filter, deadline: Deadline) -> StorageResult<DeleteResult> {
        self.begin("delete_one", &deadline)?;
        let mut documents = self.documents.write();
        let target = Self::matching(&documents, filter).map(|(id, _)| *id).next();
        match target {
            Some(id) => {
                documents.remove(&id);
                Ok(DeleteResult { deleted: 1 })
            }
            None => Ok(DeleteResult { deleted: 0 }),
        }
    }

    fn aggregate(&self, pipeline: &[Stage], deadline: Deadline) -> StorageResult<Vec<Document>> {
        self.begin("aggregate", &deadline)?;
        let documents = self.documents.read();

        let mut rows: Vec<&Document> = documents.values().collect();
        let mut projection = Projection::all();
        for stage in pipeline {
            match stage {
                Stage::TextSearch(query) => {
                    if self.text_fields.is_empty() {
                        return Err(StorageError::NoTextIndex(self.name.clone()));
                    }
                    let terms: HashSet<String> = tokenize(query).collect();
                    let mut scored: Vec<(usize, &Document)> = rows
                        .into_iter()
                        .map(|doc| (self.text_score(doc, &terms), doc))
                        .filter(|(score, _)| *score > 0)
                        .collect();
                    // Stable sort keeps identity order among equal scores.
                    scored.sort_by(|a, b| b.0.cmp(&a.0));
                    rows = scored.into_iter().map(|(_, doc)| doc).collect();
                }
                Stage::Skip(n) => {
                    rows.drain(..(*n).min(rows.len()));
                }
                Stage::Limit(n) => rows.truncate(*n),
                Stage::Project(p) => projection = p.clone(),
            }
        }

        Ok(rows.into_iter().map(|doc| projection.apply(doc)).collect())
    }
}
