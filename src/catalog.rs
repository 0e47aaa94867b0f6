//! Main Catalog struct tying gateways, cache and broker together.

use crate::context::{CancelToken, RequestContext};
use crate::error::{CatalogError, Result};
use crate::gateway::{AssemblyConfig, Assembler, Entity, Gateway, Page, PageRequest, QueryBudgets};
use crate::storage::{top_level, Collection, Filter, MemoryCollection, Projection};
use crate::subscriptions::{Snapshot, Subscription, SubscriptionBroker};
use crate::types::{
    EntityKind, Ingredient, NewIngredient, NewRecipe, Recipe, SearchHit, UpdateIngredient,
    UpdateRecipe,
};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// What a combined search does when one of its two legs fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchPolicy {
    /// Any failed leg fails the whole search.
    #[default]
    FailWhole,
    /// Return the other leg's hits and report the failure alongside them.
    Partial,
}

/// Catalog configuration.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Per-operation storage deadlines.
    pub budgets: QueryBudgets,

    /// Upper bound on a page; also the page size when a request asks for 0.
    pub max_page_size: usize,

    /// Fan-out for building timers, steps and ingredients.
    pub assembly: AssemblyConfig,

    /// Failure handling for combined search.
    pub search_policy: SearchPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            budgets: QueryBudgets::default(),
            max_page_size: 100,
            assembly: AssemblyConfig::default(),
            search_policy: SearchPolicy::default(),
        }
    }
}

/// Result of a combined recipe and ingredient search.
#[derive(Debug)]
pub struct SearchResults {
    /// Recipe hits first, then ingredient hits.
    pub page: Page<SearchHit>,
    /// Legs that failed under [`SearchPolicy::Partial`].
    pub failures: Vec<CatalogError>,
}

impl SearchResults {
    pub fn hits(&self) -> &[SearchHit] {
        &self.page.items
    }

    pub fn is_no_documents(&self) -> bool {
        self.page.is_no_documents()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// The recipe catalog.
///
/// Provides a unified interface for:
/// - Recipe and ingredient CRUD through their gateways
/// - Combined full-text search
/// - Live recipe snapshots for subscribers
///
/// Recipe writes update the cache and publish to subscribers as their last
/// step, and only after storage accepted the write.
pub struct Catalog {
    config: CatalogConfig,
    recipes: Gateway<Recipe>,
    ingredients: Gateway<Ingredient>,
    broker: SubscriptionBroker,
}

impl Catalog {
    /// Build a catalog over the given recipe and ingredient collections.
    pub fn new(
        config: CatalogConfig,
        recipes: Arc<dyn Collection>,
        ingredients: Arc<dyn Collection>,
    ) -> Self {
        let assembler = Assembler::new(config.assembly.clone());
        Self {
            recipes: Gateway::new(
                recipes,
                config.budgets.clone(),
                assembler.clone(),
                config.max_page_size,
            ),
            ingredients: Gateway::new(
                ingredients,
                config.budgets.clone(),
                assembler,
                config.max_page_size,
            ),
            broker: SubscriptionBroker::new(),
            config,
        }
    }

    /// A catalog over fresh in-memory collections with text indexes.
    pub fn in_memory(config: CatalogConfig) -> Self {
        let recipes = MemoryCollection::new(EntityKind::Recipe.collection_name())
            .with_text_index(Recipe::TEXT_FIELDS.iter().copied());
        let ingredients = MemoryCollection::new(EntityKind::Ingredient.collection_name())
            .with_text_index(Ingredient::TEXT_FIELDS.iter().copied());
        Self::new(config, Arc::new(recipes), Arc::new(ingredients))
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn recipes(&self) -> &Gateway<Recipe> {
        &self.recipes
    }

    pub fn ingredients(&self) -> &Gateway<Ingredient> {
        &self.ingredients
    }

    pub fn broker(&self) -> &SubscriptionBroker {
        &self.broker
    }

    // --- Recipes ---

    pub fn create_recipe(&self, ctx: &RequestContext, input: NewRecipe) -> Result<Recipe> {
        let recipe = self.recipes.create(ctx, input)?;
        self.broker.publish(|cache| cache.upsert(recipe.clone()));
        Ok(recipe)
    }

    pub fn bulk_create_recipes(&self, ctx: &RequestContext, inputs: Vec<NewRecipe>) -> Result<()> {
        let created = self.recipes.bulk_create(ctx, inputs)?;
        if !created.is_empty() {
            self.broker.publish(|cache| cache.extend(created));
        }
        Ok(())
    }

    pub fn update_recipe(&self, ctx: &RequestContext, input: UpdateRecipe) -> Result<Recipe> {
        let recipe = self.recipes.update(ctx, input)?;
        self.broker.publish(|cache| cache.upsert(recipe.clone()));
        Ok(recipe)
    }

    /// Delete a recipe by identity; deleting a missing recipe succeeds.
    pub fn delete_recipe(&self, ctx: &RequestContext, filter: &Filter) -> Result<()> {
        let removed = self.recipes.delete(ctx, filter)?;
        if removed {
            if let Some(id) = filter.identity()? {
                self.broker.publish(|cache| {
                    cache.remove(id);
                });
            }
        }
        Ok(())
    }

    pub fn recipe(&self, ctx: &RequestContext, filter: &Filter) -> Result<Recipe> {
        self.recipes.get(ctx, filter)
    }

    pub fn list_recipes(
        &self,
        ctx: &RequestContext,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<Recipe>> {
        self.recipes.list(ctx, filter, page)
    }

    // --- Ingredients ---

    pub fn create_ingredient(&self, ctx: &RequestContext, input: NewIngredient) -> Result<Ingredient> {
        self.ingredients.create(ctx, input)
    }

    pub fn bulk_create_ingredients(
        &self,
        ctx: &RequestContext,
        inputs: Vec<NewIngredient>,
    ) -> Result<()> {
        self.ingredients.bulk_create(ctx, inputs).map(|_| ())
    }

    pub fn update_ingredient(
        &self,
        ctx: &RequestContext,
        input: UpdateIngredient,
    ) -> Result<Ingredient> {
        self.ingredients.update(ctx, input)
    }

    pub fn delete_ingredient(&self, ctx: &RequestContext, filter: &Filter) -> Result<()> {
        self.ingredients.delete(ctx, filter).map(|_| ())
    }

    pub fn ingredient(&self, ctx: &RequestContext, filter: &Filter) -> Result<Ingredient> {
        self.ingredients.get(ctx, filter)
    }

    pub fn list_ingredients(
        &self,
        ctx: &RequestContext,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<Ingredient>> {
        self.ingredients.list(ctx, filter, page)
    }

    // --- Search ---

    /// Search recipes and standalone ingredients together.
    ///
    /// Both legs run concurrently with the same page request. How a failed
    /// leg is handled follows [`CatalogConfig::search_policy`]; when both
    /// legs fail the result is always [`CatalogError::AggregateSearch`].
    ///
    /// A projection field must belong to recipes or ingredients. Each leg
    /// applies only the fields of its own kind, and a leg none of the fields
    /// belong to returns whole documents.
    pub fn search(
        &self,
        ctx: &RequestContext,
        query: &str,
        page: PageRequest,
    ) -> Result<SearchResults> {
        if query.trim().is_empty() {
            return Err(CatalogError::invalid("search query must not be blank"));
        }

        for field in ctx.projection.fields() {
            let top = top_level(field);
            let mut known = Recipe::FIELDS.iter().chain(Ingredient::FIELDS);
            if !known.any(|f| *f == top) {
                return Err(CatalogError::invalid(format!(
                    "unknown field `{field}` in search projection"
                )));
            }
        }
        let recipe_ctx = ctx
            .clone()
            .with_projection(ctx.projection.restricted_to(Recipe::FIELDS));
        let ingredient_ctx = ctx
            .clone()
            .with_projection(ctx.projection.restricted_to(Ingredient::FIELDS));

        let (recipes, ingredients) = thread::scope(|scope| {
            let ingredients =
                scope.spawn(|| self.ingredients.search(&ingredient_ctx, query, page));
            let recipes = self.recipes.search(&recipe_ctx, query, page);
            let ingredients = ingredients
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (recipes, ingredients)
        });

        let (recipes, ingredients, failures) = match (recipes, ingredients) {
            (Ok(r), Ok(i)) => (r.into_items(), i.into_items(), Vec::new()),
            (Err(r), Err(i)) => {
                return Err(CatalogError::AggregateSearch {
                    recipes: Box::new(r),
                    ingredients: Box::new(i),
                })
            }
            (Err(e), Ok(i)) => (Vec::new(), i.into_items(), vec![self.partial(query, e)?]),
            (Ok(r), Err(e)) => (r.into_items(), Vec::new(), vec![self.partial(query, e)?]),
        };

        let hits = recipes
            .into_iter()
            .map(SearchHit::Recipe)
            .chain(ingredients.into_iter().map(SearchHit::Ingredient))
            .collect();
        Ok(SearchResults {
            page: Page::new(hits, page),
            failures,
        })
    }

    /// Apply the search policy to a single failed leg.
    fn partial(&self, query: &str, error: CatalogError) -> Result<CatalogError> {
        match self.config.search_policy {
            SearchPolicy::FailWhole => Err(error),
            SearchPolicy::Partial => {
                warn!(query, error = %error, "search leg failed, returning partial results");
                Ok(error)
            }
        }
    }

    // --- Live updates ---

    /// Subscribe to recipe snapshots until `cancel` fires.
    pub fn subscribe(&self, cancel: &CancelToken) -> Subscription {
        self.broker.subscribe(cancel)
    }

    /// The snapshot currently replayed to new subscribers.
    pub fn snapshot(&self) -> Snapshot {
        self.broker.snapshot()
    }

    /// Reload the cache from storage and publish it. Returns the recipe count.
    pub fn refresh_cache(&self, ctx: &RequestContext) -> Result<usize> {
        let ctx = RequestContext {
            projection: Projection::all(),
            ..ctx.clone()
        };
        let recipes = self.recipes.scan(&ctx, &Filter::all())?;
        let count = recipes.len();
        self.broker.publish(move |cache| cache.replace_all(recipes));
        info!(recipes = count, "catalog cache refreshed");
        Ok(count)
    }
}
