//! Backend selection.
//!
//! The configured persistence picks one storage connection at startup. Every
//! entity's [`DataAccess`] is then produced from it: the document family gets
//! [`MongoDataAccess`], every relational variant gets [`SqlxDataAccess`] over a
//! pool for its dialect.

use std::sync::Arc;

use sokoke_core::{BackendFamily, ConfigError, DatabaseSettings, Persistence};
use sokoke_data::{DataAccess, Dialect};
use sokoke_data_mongodb::{DocumentMapper, DocumentStore, MemoryStore, MongoDataAccess, MongoStore};
use sokoke_data_sqlx::{RowMapper, SqlStore, SqlxDataAccess};

use crate::error::StartupError;

/// The live storage connection.
#[derive(Clone)]
pub enum Backend {
    Document(Arc<dyn DocumentStore>),
    Relational(SqlStore),
}

/// Dialect of a relational persistence; `None` for the document store.
pub fn dialect_for(persistence: Persistence) -> Option<Dialect> {
    match persistence {
        Persistence::MongoDb => None,
        Persistence::Sqlite => Some(Dialect::Sqlite),
        Persistence::Postgres => Some(Dialect::Postgres),
        Persistence::MySql => Some(Dialect::MySql),
    }
}

impl Backend {
    /// Open the connection for the configured persistence.
    ///
    /// A relational persistence without a usable connection URL is a
    /// configuration error; it never falls back to the document store.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StartupError> {
        tracing::info!(persistence = %settings.persistence, "connecting storage backend");
        match settings.persistence.family() {
            BackendFamily::Relational => {
                let unconfigured = || ConfigError::Invalid {
                    key: "persistence".to_string(),
                    value: settings.persistence.to_string(),
                };
                let dialect = dialect_for(settings.persistence).ok_or_else(unconfigured)?;
                let url = settings.sql_url()?.ok_or_else(unconfigured)?;
                let store = SqlStore::connect(&url, dialect, settings.pool_size).await?;
                Ok(Backend::Relational(store))
            }
            BackendFamily::Document => {
                let store =
                    MongoStore::connect(&settings.mongodb_uri, &settings.mongodb_database).await?;
                Ok(Backend::Document(Arc::new(store)))
            }
        }
    }

    /// A document backend kept in process memory.
    pub fn in_memory() -> Self {
        Backend::Document(Arc::new(MemoryStore::new()))
    }

    pub fn family(&self) -> BackendFamily {
        match self {
            Backend::Document(_) => BackendFamily::Document,
            Backend::Relational(_) => BackendFamily::Relational,
        }
    }

    /// The data access for `E` on this backend.
    pub fn data_access<E>(&self) -> Arc<dyn DataAccess<E>>
    where
        E: RowMapper + DocumentMapper,
    {
        match self {
            Backend::Document(store) => Arc::new(MongoDataAccess::<E>::new(store.clone())),
            Backend::Relational(store) => Arc::new(SqlxDataAccess::<E>::new(store.clone())),
        }
    }

    pub async fn shutdown(&self) {
        match self {
            Backend::Document(store) => store.close().await,
            Backend::Relational(store) => store.close().await,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Document(_) => f.write_str("Backend::Document"),
            Backend::Relational(store) => f.debug_tuple("Backend::Relational").field(store).finish(),
        }
    }
}
