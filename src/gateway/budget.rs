//! Deadline budgets per gateway operation.

use std::time::Duration;

/// How long a single storage call may take, per operation class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryBudgets {
    /// Single-entity insert, update and delete.
    pub write: Duration,
    /// Point lookup.
    pub read: Duration,
    /// One page of a listing.
    pub list: Duration,
    /// One page of a text search.
    pub search: Duration,
    pub bulk_base: Duration,
    pub bulk_per_item: Duration,
    pub bulk_max: Duration,
}

impl Default for QueryBudgets {
    fn default() -> Self {
        Self {
            write: Duration::from_millis(350),
            read: Duration::from_millis(500),
            list: Duration::from_millis(2000),
            search: Duration::from_millis(1000),
            bulk_base: Duration::from_millis(500),
            bulk_per_item: Duration::from_millis(2),
            bulk_max: Duration::from_millis(2000),
        }
    }
}

impl QueryBudgets {
    /// Budget for a batched insert of `items` documents, capped at `bulk_max`.
    pub fn bulk(&self, items: usize) -> Duration {
        let items = u32::try_from(items).unwrap_or(u32::MAX);
        self.bulk_base
            .saturating_add(self.bulk_per_item.saturating_mul(items))
            .min(self.bulk_max)
    }
}
