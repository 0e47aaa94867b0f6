//! Typed filters and projections over documents.

use crate::error::{CatalogError, Result};
use crate::storage::Document;
use crate::types::ObjectId;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Reserved field holding a document's identity.
pub const ID_FIELD: &str = "id";

/// A value a filter field is compared against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Id(ObjectId),
    Text(String),
    Number(i64),
}

impl FilterValue {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FilterValue::Id(id), Value::String(s)) => ObjectId::from_hex(s).is_ok_and(|v| v == *id),
            (FilterValue::Text(t), Value::String(s)) => t == s,
            (FilterValue::Number(n), Value::Number(v)) => v.as_i64() == Some(*n),
            _ => false,
        }
    }
}

impl From<ObjectId> for FilterValue {
    fn from(id: ObjectId) -> Self {
        FilterValue::Id(id)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Id(id) => write!(f, "{id}"),
            FilterValue::Text(s) => write!(f, "{s:?}"),
            FilterValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Equality filter keyed by field name. Every field must match.
///
/// Dotted names reach into embedded documents; an array-valued field matches
/// when any element matches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    fields: BTreeMap<String, FilterValue>,
}

impl Filter {
    /// Matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: ObjectId) -> Self {
        Self::default().eq(ID_FIELD, id)
    }

    /// Parse an identity string into an identity filter.
    pub fn by_id_str(id: &str) -> Result<Self> {
        Ok(Self::by_id(parse_identity(id)?))
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Convert an untyped boundary map.
    ///
    /// `"id"` must be a 24-digit hex string; other values must be strings or
    /// integers.
    pub fn from_json(map: &serde_json::Map<String, Value>) -> Result<Self> {
        let mut filter = Self::default();
        for (field, value) in map {
            let typed = match (field.as_str(), value) {
                (ID_FIELD, Value::String(s)) => FilterValue::Id(parse_identity(s)?),
                (ID_FIELD, other) => {
                    return Err(CatalogError::invalid(format!(
                        "identity filter must be a string, got {other}"
                    )))
                }
                (_, Value::String(s)) => FilterValue::Text(s.clone()),
                (_, Value::Number(n)) => FilterValue::Number(n.as_i64().ok_or_else(|| {
                    CatalogError::invalid(format!("filter on `{field}` must be an integer, got {n}"))
                })?),
                (_, other) => {
                    return Err(CatalogError::invalid(format!(
                        "unsupported filter value for `{field}`: {other}"
                    )))
                }
            };
            filter.fields.insert(field.clone(), typed);
        }
        Ok(filter)
    }

    /// The identity this filter pins, if any.
    ///
    /// Fails when the reserved key holds something other than a valid identity.
    pub fn identity(&self) -> Result<Option<ObjectId>> {
        match self.fields.get(ID_FIELD) {
            None => Ok(None),
            Some(FilterValue::Id(id)) => Ok(Some(*id)),
            Some(FilterValue::Text(s)) => parse_identity(s).map(Some),
            Some(other) => Err(CatalogError::invalid(format!(
                "identity filter must be an object id, got {other}"
            ))),
        }
    }

    /// Reject filters that can never be sent to storage and canonicalize the
    /// identity key to an [`FilterValue::Id`].
    pub fn normalized(&self) -> Result<Self> {
        let mut filter = self.clone();
        if let Some(id) = self.identity()? {
            filter.fields.insert(ID_FIELD.to_string(), FilterValue::Id(id));
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether a document satisfies every field of this filter.
    pub fn matches(&self, doc: &Document) -> bool {
        self.fields.iter().all(|(field, expected)| {
            let path: Vec<&str> = field.split('.').collect();
            let mut found = Vec::new();
            if let Some((head, rest)) = path.split_first() {
                if let Some(value) = doc.get(*head) {
                    collect_path(value, rest, &mut found);
                }
            }
            found.into_iter().any(|v| expected.matches(v))
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (field, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {value}")?;
        }
        f.write_str("}")
    }
}

pub(crate) fn parse_identity(s: &str) -> Result<ObjectId> {
    ObjectId::from_hex(s).map_err(|e| CatalogError::invalid(format!("malformed identity {s:?}: {e}")))
}

/// Collect the leaf values at `path`, flattening arrays along the way.
pub(crate) fn collect_path<'a>(value: &'a Value, path: &[&str], out: &mut Vec<&'a Value>) {
    match (value, path.split_first()) {
        (Value::Array(items), _) => {
            for item in items {
                collect_path(item, path, out);
            }
        }
        (_, None) => out.push(value),
        (Value::Object(map), Some((head, rest))) => {
            if let Some(next) = map.get(*head) {
                collect_path(next, rest, out);
            }
        }
        _ => {}
    }
}

/// The set of fields a caller wants populated. Empty means every field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    fields: BTreeSet<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Keep only the projected top-level fields. The identity is always kept.
    pub fn apply(&self, doc: &Document) -> Document {
        if self.is_all() {
            return doc.clone();
        }
        doc.iter()
            .filter(|(key, _)| key.as_str() == ID_FIELD || self.includes(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The fields whose top-level name is in `known`. Falls back to every
    /// field when none of them are.
    pub fn restricted_to(&self, known: &[&str]) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|f| known.iter().any(|k| *k == top_level(f)))
                .cloned()
                .collect(),
        }
    }

    fn includes(&self, key: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f == key || f.split('.').next() == Some(key))
    }
}

/// First segment of a dotted path.
pub(crate) fn top_level(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}
