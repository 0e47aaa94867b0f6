//! Subscription system for live catalog updates.
//!
//! Observers receive the full recipe snapshot:
//! - once on joining (replay of the cached catalog)
//! - after every recipe write that reaches the cache
//!
//! Each observer has a single-slot buffer. Publishing never blocks; an
//! observer that has not read its slot gets the newer snapshot in place of
//! the old one. An observer lives exactly as long as its cancel token.
//!
//! # Example
//!
//! ```ignore
//! let broker = SubscriptionBroker::new();
//! let token = CancelToken::new();
//! let subscription = broker.subscribe(&token);
//!
//! // First message is the current catalog.
//! let snapshot = subscription.recv()?;
//!
//! broker.publish(|cache| cache.upsert(recipe));
//! let snapshot = subscription.recv()?;
//!
//! // Ends the stream and removes the observer.
//! token.cancel();
//! ```

mod cache;
mod manager;
mod types;

pub use cache::CatalogCache;
pub use manager::SubscriptionBroker;
pub use types::{Snapshot, SubscriberId, Subscription};
