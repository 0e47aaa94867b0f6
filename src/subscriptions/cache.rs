//! The last known recipe slice replayed to subscribers.

use crate::types::{ObjectId, Recipe};

use super::types::Snapshot;

/// Recipes ordered by identity. Derived from writes; storage stays authoritative.
#[derive(Clone, Debug, Default)]
pub struct CatalogCache {
    recipes: Vec<Recipe>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a recipe or replace the one with the same identity.
    ///
    /// Recipes without an identity were never stored and are ignored.
    pub fn upsert(&mut self, recipe: Recipe) {
        let Some(id) = recipe.id else {
            return;
        };
        match self.position(id) {
            Ok(i) => self.recipes[i] = recipe,
            Err(i) => self.recipes.insert(i, recipe),
        }
    }

    pub fn extend<I: IntoIterator<Item = Recipe>>(&mut self, recipes: I) {
        for recipe in recipes {
            self.upsert(recipe);
        }
    }

    /// Returns true if a recipe was removed.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        match self.position(id) {
            Ok(i) => {
                self.recipes.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    pub fn replace_all(&mut self, recipes: Vec<Recipe>) {
        self.recipes.clear();
        self.extend(recipes);
    }

    pub fn get(&self, id: ObjectId) -> Option<&Recipe> {
        self.position(id).ok().map(|i| &self.recipes[i])
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(self.recipes.as_slice())
    }

    fn position(&self, id: ObjectId) -> Result<usize, usize> {
        self.recipes.binary_search_by(|r| r.id.cmp(&Some(id)))
    }
}
