use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::access::DataAccess;
use crate::entity::Entity;
use crate::error::DataError;
use crate::page::SearchMetadata;
use crate::search::SearchSpec;

/// Outcome of a repository call.
///
/// Serialises with a `status` discriminator; exactly one of `data` and
/// `error` is ever present.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RepositoryResult<T> {
    Success {
        message: String,
        data: T,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<SearchMetadata>,
    },
    Error {
        message: String,
        #[serde(serialize_with = "serialize_error")]
        error: DataError,
    },
}

impl<T> RepositoryResult<T> {
    fn success(message: String, data: T) -> Self {
        RepositoryResult::Success {
            message,
            data,
            metadata: None,
        }
    }

    fn failure(error: DataError) -> Self {
        RepositoryResult::Error {
            message: error.to_string(),
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RepositoryResult::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    pub fn message(&self) -> &str {
        match self {
            RepositoryResult::Success { message, .. } | RepositoryResult::Error { message, .. } => {
                message
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            RepositoryResult::Success { data, .. } => Some(data),
            RepositoryResult::Error { .. } => None,
        }
    }

    pub fn metadata(&self) -> Option<&SearchMetadata> {
        match self {
            RepositoryResult::Success { metadata, .. } => metadata.as_ref(),
            RepositoryResult::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&DataError> {
        match self {
            RepositoryResult::Success { .. } => None,
            RepositoryResult::Error { error, .. } => Some(error),
        }
    }

    /// Convert back into a plain `Result`, dropping message and metadata.
    pub fn into_result(self) -> Result<T, DataError> {
        match self {
            RepositoryResult::Success { data, .. } => Ok(data),
            RepositoryResult::Error { error, .. } => Err(error),
        }
    }
}

fn serialize_error<S: Serializer>(error: &DataError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// The only surface higher layers call.
///
/// Wraps every bound [`DataAccess`] call in a [`RepositoryResult`], logging
/// inputs, outputs and errors. Failures are surfaced immediately, never retried.
pub struct Repository<E: Entity> {
    access: Arc<dyn DataAccess<E>>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            access: self.access.clone(),
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(access: Arc<dyn DataAccess<E>>) -> Self {
        Self { access }
    }

    pub async fn create(&self, input: E::Create) -> RepositoryResult<E> {
        tracing::info!(entity = E::name(), method = "create", input = ?input, "repository call");
        match self.access.create(input).await {
            Ok(created) => {
                tracing::info!(entity = E::name(), method = "create", id = created.id(), "created");
                RepositoryResult::success(format!("{} created", E::name()), created)
            }
            Err(err) => Self::failed("create", err),
        }
    }

    pub async fn read(&self, id: &str) -> RepositoryResult<E> {
        tracing::info!(entity = E::name(), method = "read", id, "repository call");
        match self.access.read(id).await {
            Ok(found) => {
                tracing::info!(entity = E::name(), method = "read", output = ?found, "found");
                RepositoryResult::success(format!("{} found", E::name()), found)
            }
            Err(err) => Self::failed("read", err),
        }
    }

    /// Search; an empty result is still a success.
    pub async fn read_all(&self, spec: Option<&SearchSpec<E>>) -> RepositoryResult<Vec<E>> {
        tracing::info!(entity = E::name(), method = "read_all", spec = ?spec, "repository call");
        match self.access.read_all(spec).await {
            Ok(result) => {
                tracing::info!(
                    entity = E::name(),
                    method = "read_all",
                    items = result.items.len(),
                    total = result.metadata.total,
                    search_time_ms = result.metadata.search_time,
                    "found"
                );
                RepositoryResult::Success {
                    message: format!("{} found", E::plural_name()),
                    data: result.items,
                    metadata: Some(result.metadata),
                }
            }
            Err(err) => Self::failed("read_all", err),
        }
    }

    pub async fn update(&self, id: &str, input: E::Update) -> RepositoryResult<E> {
        tracing::info!(entity = E::name(), method = "update", id, input = ?input, "repository call");
        match self.access.update(id, input).await {
            Ok(updated) => {
                tracing::info!(entity = E::name(), method = "update", output = ?updated, "updated");
                RepositoryResult::success(format!("{} updated", E::name()), updated)
            }
            Err(err) => Self::failed("update", err),
        }
    }

    pub async fn delete(&self, id: &str) -> RepositoryResult<E> {
        tracing::info!(entity = E::name(), method = "delete", id, "repository call");
        match self.access.delete(id).await {
            Ok(deleted) => {
                tracing::info!(entity = E::name(), method = "delete", output = ?deleted, "deleted");
                RepositoryResult::success(format!("{} deleted", E::name()), deleted)
            }
            Err(err) => Self::failed("delete", err),
        }
    }

    fn failed<T>(method: &'static str, err: DataError) -> RepositoryResult<T> {
        tracing::error!(entity = E::name(), method, error = %err, "repository call failed");
        RepositoryResult::failure(err)
    }
}
