//! Query gateway: bounded CRUD and search per entity kind.
//!
//! Outcomes are kept apart:
//! - nothing found on a list or search: an empty [`Page`] flagged
//!   [`PageStatus::NoDocuments`]
//! - nothing found on a point lookup: [`CatalogError::NotFound`]
//! - bad input (malformed identity, missing identity on delete, unknown
//!   projection field): [`CatalogError::InvalidArgument`], raised before
//!   any storage call
//! - storage failure or timeout: [`CatalogError::Persistence`]
//!
//! [`CatalogError::NotFound`]: crate::CatalogError::NotFound
//! [`CatalogError::InvalidArgument`]: crate::CatalogError::InvalidArgument
//! [`CatalogError::Persistence`]: crate::CatalogError::Persistence

mod assembly;
mod budget;
mod entity;
mod page;
mod query;

pub use assembly::{Assembler, AssemblyConfig};
pub use budget::QueryBudgets;
pub use entity::Entity;
pub use page::{Page, PageRequest, PageStatus};
pub use query::Gateway;
