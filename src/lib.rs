//! # Recipe Catalog
//!
//! A recipe and ingredient catalog with deadline-bounded queries and live
//! recipe snapshots.
//!
//! ## Core Concepts
//!
//! - **Gateway**: per-entity CRUD and search where every storage call carries
//!   its own deadline and "nothing found", "bad input" and "storage failed"
//!   stay distinct
//! - **Collection**: the storage port; an in-memory implementation ships with
//!   the crate
//! - **Broker**: registry of live subscribers fed with catalog snapshots,
//!   each removed exactly once when its cancel token fires
//! - **Cache**: the last known recipe slice, replayed to every new subscriber
//!
//! ## Example
//!
//! ```ignore
//! use recipe_catalog::{Catalog, CatalogConfig, CancelToken, Filter, NewRecipe, RequestContext};
//!
//! let catalog = Catalog::in_memory(CatalogConfig::default());
//! let ctx = RequestContext::background();
//!
//! let token = CancelToken::new();
//! let updates = catalog.subscribe(&token);
//!
//! let soup = catalog.create_recipe(&ctx, NewRecipe::named("Tomato Soup"))?;
//! assert_eq!(soup.slug, "tomato-soup");
//!
//! let fetched = catalog.recipe(&ctx, &Filter::by_id(soup.id.unwrap()))?;
//! let latest = updates.recv()?;
//!
//! token.cancel();
//! ```

pub mod catalog;
pub mod context;
pub mod error;
pub mod gateway;
pub mod slug;
pub mod storage;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use catalog::{Catalog, CatalogConfig, SearchPolicy, SearchResults};
pub use context::{CancelToken, Deadline, RequestContext};
pub use error::{CatalogError, Result, StorageError};
pub use gateway::{
    Assembler, AssemblyConfig, Entity, Gateway, Page, PageRequest, PageStatus, QueryBudgets,
};
pub use slug::slugify;
pub use storage::{
    Collection, DeleteResult, Document, Filter, FilterValue, FindOptions, MemoryCollection,
    Projection, Stage, StorageResult, UpdateResult, ID_FIELD,
};
pub use subscriptions::{CatalogCache, Snapshot, SubscriberId, Subscription, SubscriptionBroker};
pub use types::*;
