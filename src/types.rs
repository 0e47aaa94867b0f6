//! Core types for the catalog.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage-assigned identity.
///
/// Layout: 4-byte big-endian UNIX seconds, 5 process-unique bytes and a
/// 3-byte big-endian counter, so byte order is creation order within a process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

static COUNTER: AtomicU32 = AtomicU32::new(0);
static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();

fn process_unique() -> [u8; 5] {
    *PROCESS_UNIQUE.get_or_init(|| {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut hasher = Sha256::new();
        hasher.update(std::process::id().to_be_bytes());
        hasher.update(started.to_be_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 5];
        out.copy_from_slice(&digest[..5]);
        out
    })
}

impl ObjectId {
    /// Generate a fresh identity.
    pub fn generate() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) & 0x00FF_FFFF;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&process_unique());
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        ObjectId(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string. Anything but exactly 24 hex digits is rejected.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 12] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(ObjectId(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(|e| de::Error::custom(format!("invalid object id {s:?}: {e}")))
    }
}

/// The two entity kinds the catalog stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Recipe,
    Ingredient,
}

impl EntityKind {
    /// Default collection name for this kind.
    pub fn collection_name(self) -> &'static str {
        match self {
            EntityKind::Recipe => "recipes",
            EntityKind::Ingredient => "ingredients",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Recipe => f.write_str("recipe"),
            EntityKind::Ingredient => f.write_str("ingredient"),
        }
    }
}

/// An ingredient, either embedded in a recipe or a standalone catalog item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ingredient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Always `slugify(name)`.
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: String,
}

/// A recipe with its embedded ingredients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Always `slugify(name)`.
    pub slug: String,
    pub timers: Vec<String>,
    pub steps: Vec<String>,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "originalURL")]
    pub original_url: String,
    pub ingredients: Vec<Ingredient>,
}

/// Input for creating an ingredient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewIngredient {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: String,
}

impl NewIngredient {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            quantity: quantity.into(),
        }
    }
}

/// Input for creating a recipe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRecipe {
    pub name: String,
    pub timers: Vec<String>,
    pub steps: Vec<String>,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "originalURL")]
    pub original_url: String,
    pub ingredients: Vec<NewIngredient>,
}

impl NewRecipe {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Input for updating an ingredient.
///
/// The identity is the caller's unparsed string. For ingredients embedded in
/// a recipe update it may be absent, in which case a new identity is assigned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateIngredient {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: String,
}

/// Input for updating a recipe. Replaces every mutable field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRecipe {
    pub id: String,
    pub name: String,
    pub timers: Vec<String>,
    pub steps: Vec<String>,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "originalURL")]
    pub original_url: String,
    pub ingredients: Vec<UpdateIngredient>,
}

/// One hit of a combined search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchHit {
    Recipe(Recipe),
    Ingredient(Ingredient),
}

impl SearchHit {
    pub fn kind(&self) -> EntityKind {
        match self {
            SearchHit::Recipe(_) => EntityKind::Recipe,
            SearchHit::Ingredient(_) => EntityKind::Ingredient,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SearchHit::Recipe(r) => &r.name,
            SearchHit::Ingredient(i) => &i.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_ordered_and_unique() {
        let ids: Vec<ObjectId> = (0..100).map(|_| ObjectId::generate()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_hex_parsing_rejects_malformed() {
        let id = ObjectId::generate();
        assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
        assert!(ObjectId::from_hex("not-an-id").is_err());
        assert!(ObjectId::from_hex("abcdef").is_err());
        assert!(ObjectId::from_hex("zzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn test_recipe_serializes_with_external_field_names() {
        let recipe = Recipe {
            name: "Toast".to_string(),
            image_url: "http://img".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&recipe).unwrap();
        assert_eq!(value["imageURL"], "http://img");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_partial_document_deserializes_with_defaults() {
        let recipe: Recipe = serde_json::from_value(serde_json::json!({"name": "Toast"})).unwrap();
        assert_eq!(recipe.name, "Toast");
        assert!(recipe.steps.is_empty());
    }
}
