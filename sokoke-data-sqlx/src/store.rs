use std::time::Duration;

use sokoke_data::query::Dialect;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::error::{SqlxErrorExt, SqlxResult};

/// A pooled connection to one relational database.
///
/// Every relational persistence shares this type; only the URL and the
/// [`Dialect`] differ.
#[derive(Clone, Debug)]
pub struct SqlStore {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlStore {
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    /// Open a pool of at most `pool_size` connections.
    ///
    /// An in-memory SQLite database lives and dies with its connection, so
    /// it always gets exactly one connection that is never recycled.
    pub async fn connect(url: &str, dialect: Dialect, pool_size: u32) -> SqlxResult<Self> {
        sqlx::any::install_default_drivers();

        let options = if url.contains(":memory:") {
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            AnyPoolOptions::new().max_connections(pool_size.max(1))
        };
        let pool = options
            .connect(url)
            .await
            .map_err(|e| e.into_data_error())?;

        tracing::info!(dialect = dialect.name(), pool_size, "relational store connected");
        Ok(Self { pool, dialect })
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Run a statement without bind parameters, such as DDL.
    pub async fn execute(&self, sql: &str) -> SqlxResult<u64> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.into_data_error())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(dialect = self.dialect.name(), "relational store closed");
    }
}
