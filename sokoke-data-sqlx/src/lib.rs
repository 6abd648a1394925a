//! # sokoke-data-sqlx — relational backend for the Sokoke data layer
//!
//! One search compiler and one [`DataAccess`](sokoke_data::DataAccess)
//! implementation serve SQLite, PostgreSQL and MySQL through `sqlx::AnyPool`.
//! Only the connection URL and the [`Dialect`](sokoke_data::Dialect) differ.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlStore`] | Pool plus dialect for one relational database |
//! | [`compile_search`] | Resolved search to count and fetch statements |
//! | [`RowMapper`] | Joined row to canonical entity, per entity |
//! | [`SqlxDataAccess`] | The relational `DataAccess<E>` |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! All three are on by default so the persistence can be picked from
//! configuration at startup.
//!
//! # Storage conventions
//!
//! Timestamps are stored as fixed-width text (`2024-01-15T09:30:00.000Z`),
//! so range filters and ordering compare lexically in every dialect.
//! Booleans are native columns on PostgreSQL and MySQL. On SQLite they must
//! be declared `INTEGER`: `sqlx::Any` rejects rows containing a column
//! declared `BOOLEAN`. Boolean selects are also read through
//! `CAST(.. AS INTEGER)` there.
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use sokoke_data_sqlx::SqlxErrorExt;
//!
//! let row = sqlx::query("SELECT ...")
//!     .fetch_one(store.pool())
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod access;
pub mod compile;
pub mod error;
pub mod row;
pub mod store;

pub use access::SqlxDataAccess;
pub use compile::{children_select, compile_search, CompiledSearch};
pub use error::{SqlxErrorExt, SqlxResult};
pub use row::{RelatedRows, RowMapper, RowReader};
pub use store::SqlStore;

/// Re-exports of the most commonly used types from both `sokoke-data` and this crate.
pub mod prelude {
    pub use crate::{RowMapper, RowReader, SqlStore, SqlxDataAccess, SqlxErrorExt};
    pub use sokoke_data::prelude::*;
}
