use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::DataError;
use crate::page::SearchResult;
use crate::search::SearchSpec;

/// The per-entity storage contract, implemented once per backend family.
///
/// Implementations are chosen once at startup and shared behind
/// `Arc<dyn DataAccess<E>>`; callers never learn which backend answers.
#[async_trait]
pub trait DataAccess<E: Entity>: Send + Sync {
    async fn create(&self, input: E::Create) -> Result<E, DataError>;

    async fn read(&self, id: &str) -> Result<E, DataError>;

    /// Run a search. `None` returns every record, unpaginated.
    async fn read_all(&self, spec: Option<&SearchSpec<E>>) -> Result<SearchResult<E>, DataError>;

    async fn update(&self, id: &str, input: E::Update) -> Result<E, DataError>;

    /// Remove a record and return it as it was before removal.
    async fn delete(&self, id: &str) -> Result<E, DataError>;
}
