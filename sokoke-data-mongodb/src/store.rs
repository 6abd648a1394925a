use async_trait::async_trait;
use bson::Document;

use crate::error::MongoResult;

/// A fully specified `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Document,
    /// Keys in priority order, `1` ascending and `-1` descending.
    pub sort: Document,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    /// `_id` plus the kept keys; `None` keeps every key.
    pub projection: Option<Document>,
}

/// The document operations the search layer needs from a store.
///
/// Implemented by [`MongoStore`](crate::MongoStore) for a real server and by
/// [`MemoryStore`](crate::MemoryStore) for in-process use; both accept the
/// same filter documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn count(&self, collection: &str, filter: Document) -> MongoResult<u64>;

    async fn find(&self, collection: &str, query: FindQuery) -> MongoResult<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: Document) -> MongoResult<Option<Document>>;

    async fn insert(&self, collection: &str, document: Document) -> MongoResult<()>;

    /// Apply `$set` to the first match and return the document after the update.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> MongoResult<Option<Document>>;

    /// Remove the first match and return it.
    async fn delete_one(&self, collection: &str, filter: Document) -> MongoResult<Option<Document>>;

    /// Release the connection. The store must not be used afterwards.
    async fn close(&self) {}
}
