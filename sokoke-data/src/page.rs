use std::time::Duration;

use serde::Serialize;

use crate::search::Pagination;

/// Pagination and timing metadata attached to every search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    /// Matching records before pagination.
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_more: bool,
    /// Wall-clock time of the count and fetch, in milliseconds.
    pub search_time: u64,
}

impl SearchMetadata {
    /// Without pagination the whole result is a single page of `total` items.
    pub fn new(total: u64, pagination: Option<Pagination>, elapsed: Duration) -> Self {
        let search_time = elapsed.as_millis() as u64;
        match pagination {
            Some(p) => {
                let total_pages = total.div_ceil(p.limit());
                SearchMetadata {
                    total,
                    page: p.page(),
                    limit: p.limit(),
                    total_pages,
                    has_more: p.page() < total_pages,
                    search_time,
                }
            }
            None => SearchMetadata {
                total,
                page: 1,
                limit: total,
                total_pages: u64::from(total > 0),
                has_more: false,
                search_time,
            },
        }
    }
}

/// The uniform result of a search: mapped entities plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult<T> {
    pub items: Vec<T>,
    pub metadata: SearchMetadata,
}

impl<T> SearchResult<T> {
    pub fn new(items: Vec<T>, metadata: SearchMetadata) -> Self {
        Self { items, metadata }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> SearchResult<U> {
        SearchResult {
            items: self.items.into_iter().map(f).collect(),
            metadata: self.metadata,
        }
    }
}
