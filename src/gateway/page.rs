//! Pagination requests and result pages.

use serde::{Deserialize, Serialize};

/// A page request. `page` is zero-based: page `n` skips `n * limit` results.
///
/// A `limit` of zero means "no explicit limit" and resolves to the gateway's
/// maximum page size, as does any limit above it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: usize,
    pub page: usize,
}

impl PageRequest {
    pub fn new(limit: usize, page: usize) -> Self {
        Self { limit, page }
    }

    pub fn first(limit: usize) -> Self {
        Self::new(limit, 0)
    }

    /// Resolve to `(skip, limit)` under a maximum page size.
    pub fn resolve(self, max_page_size: usize) -> (usize, usize) {
        let max = max_page_size.max(1);
        let limit = if self.limit == 0 { max } else { self.limit.min(max) };
        (self.page.saturating_mul(limit), limit)
    }
}

/// Whether a page carried any documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Documents,
    /// The query ran fine and matched nothing.
    NoDocuments,
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub status: PageStatus,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest) -> Self {
        let status = if items.is_empty() {
            PageStatus::NoDocuments
        } else {
            PageStatus::Documents
        };
        Self {
            items,
            request,
            status,
        }
    }

    pub fn is_no_documents(&self) -> bool {
        self.status == PageStatus::NoDocuments
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_zero_based_pages() {
        assert_eq!(PageRequest::new(10, 0).resolve(100), (0, 10));
        assert_eq!(PageRequest::new(10, 3).resolve(100), (30, 10));
    }

    #[test]
    fn test_resolve_clamps_limit() {
        assert_eq!(PageRequest::new(0, 1).resolve(50), (50, 50));
        assert_eq!(PageRequest::new(500, 2).resolve(50), (100, 50));
        assert_eq!(PageRequest::new(5, usize::MAX).resolve(50), (usize::MAX, 5));
    }

    #[test]
    fn test_empty_page_signals_no_documents() {
        let page: Page<u8> = Page::new(Vec::new(), PageRequest::first(10));
        assert!(page.is_no_documents());
        assert!(!Page::new(vec![1u8], PageRequest::first(10)).is_no_documents());
    }
}
