use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value::Value;

/// Largest page size any backend will return.
pub const MAX_LIMIT: u64 = 100;
/// Page size used when only `page` is supplied.
pub const DEFAULT_LIMIT: u64 = 10;

/// A backend-neutral description of what to fetch for entity `E`.
///
/// # Example
///
/// ```ignore
/// let spec = SearchSpec::<Feature>::new()
///     .filter("completed", false)
///     .sort_by("name", SortOrder::Asc)
///     .paginate(2, 10);
/// let page = repository.read_all(Some(&spec)).await;
/// ```
#[derive(Serialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct SearchSpec<E> {
    /// Exact-match equality per canonical field, AND-combined.
    pub filters: BTreeMap<String, Value>,
    /// Filter values as written in a query string.
    ///
    /// Text fields match these verbatim, so `name=007` stays `"007"`.
    #[serde(skip)]
    pub raw_filters: BTreeMap<String, String>,
    pub pagination: Option<Pagination>,
    /// Earlier entries are primary, later ones break ties.
    pub sort: Vec<SortField>,
    pub search: Option<TextSearch>,
    pub advanced: Advanced,
    #[serde(skip)]
    _entity: PhantomData<fn() -> E>,
}

impl<E> SearchSpec<E> {
    pub fn new() -> Self {
        SearchSpec {
            filters: BTreeMap::new(),
            raw_filters: BTreeMap::new(),
            pagination: None,
            sort: Vec::new(),
            search: None,
            advanced: Advanced::default(),
            _entity: PhantomData,
        }
    }

    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.raw_filters.remove(field);
        self.filters.insert(field.to_string(), value.into());
        self
    }

    pub fn paginate(mut self, page: i64, limit: i64) -> Self {
        self.pagination = Some(Pagination::new(page, limit));
        self
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort.push(SortField {
            field: field.to_string(),
            order,
        });
        self
    }

    pub fn search(mut self, search: TextSearch) -> Self {
        self.search = Some(search);
        self
    }

    pub fn date_range(
        mut self,
        field: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.advanced.date_range.push(DateRange {
            field: field.to_string(),
            start,
            end,
        });
        self
    }

    pub fn numeric_range(mut self, field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        self.advanced.numeric_range.push(NumericRange {
            field: field.to_string(),
            min,
            max,
        });
        self
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.advanced.select = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn populate(mut self, relations: &[&str]) -> Self {
        self.advanced.populate = relations.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.advanced.include_deleted = include;
        self
    }

    /// `true` when the spec carries no constraint at all.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.pagination.is_none()
            && self.sort.is_empty()
            && self.search.is_none()
            && self.advanced.is_empty()
    }
}

impl<E> Default for SearchSpec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for SearchSpec<E> {
    fn clone(&self) -> Self {
        SearchSpec {
            filters: self.filters.clone(),
            raw_filters: self.raw_filters.clone(),
            pagination: self.pagination,
            sort: self.sort.clone(),
            search: self.search.clone(),
            advanced: self.advanced.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for SearchSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSpec")
            .field("filters", &self.filters)
            .field("pagination", &self.pagination)
            .field("sort", &self.sort)
            .field("search", &self.search)
            .field("advanced", &self.advanced)
            .finish()
    }
}

/// 1-based page with a page size in `1..=100`.
///
/// Out-of-range input is clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Pagination {
            page: page.max(1) as u64,
            limit: limit.clamp(1, MAX_LIMIT as i64) as u64,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of records to skip, saturating at `i64::MAX`.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a direction token; anything unrecognised is ascending.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" | "-1" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSearch {
    pub query: String,
    /// Fields to search; empty means the backend's full-text default.
    pub fields: Vec<String>,
    pub options: SearchOptions,
}

impl TextSearch {
    pub fn new(query: &str) -> Self {
        TextSearch {
            query: query.to_string(),
            fields: Vec::new(),
            options: SearchOptions::default(),
        }
    }

    pub fn in_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.options.case_sensitive = yes;
        self
    }

    pub fn regex(mut self, yes: bool) -> Self {
        self.options.use_regex = yes;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub use_regex: bool,
    /// Accepted and carried; no backend performs fuzzy matching.
    pub fuzzy_tolerance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advanced {
    pub date_range: Vec<DateRange>,
    pub numeric_range: Vec<NumericRange>,
    pub select: Vec<String>,
    pub populate: Vec<String>,
    pub include_deleted: bool,
}

impl Advanced {
    pub fn is_empty(&self) -> bool {
        self.date_range.is_empty()
            && self.numeric_range.is_empty()
            && self.select.is_empty()
            && self.populate.is_empty()
            && !self.include_deleted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub field: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericRange {
    pub field: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}
