//! # sokoke-data-mongodb — document backend for the Sokoke data layer
//!
//! Compiles searches into MongoDB filter documents and runs them against a
//! [`DocumentStore`]: a live server through [`MongoStore`], or the in-process
//! [`MemoryStore`] that evaluates the same filters.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DocumentStore`] | The document operations the data layer needs |
//! | [`MongoStore`] | `DocumentStore` over the official driver |
//! | [`MemoryStore`] | `DocumentStore` kept in process memory |
//! | [`compile_search`] | Resolved search to filter, sort, skip/limit and projection |
//! | [`DocumentMapper`] | Stored document to canonical entity, per entity |
//! | [`MongoDataAccess`] | The document `DataAccess<E>` |
//! | [`MongoErrorExt`] | Extension trait to convert driver errors → `DataError` (`.into_data_error()`) |
//!
//! # Storage conventions
//!
//! Identifiers are UUID strings under `_id`. Timestamps are BSON dates.
//! Relations are stored as the related id and replaced by the related
//! document when populated.

pub mod access;
pub mod compile;
pub mod error;
pub mod mapper;
pub mod memory;
pub mod mongo;
pub mod store;

pub use access::MongoDataAccess;
pub use compile::{compile_search, escape_regex};
pub use error::{MongoErrorExt, MongoResult};
pub use mapper::{DocumentMapper, DocumentReader};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DocumentStore, FindQuery};

/// Re-exports of the most commonly used types from both `sokoke-data` and this crate.
pub mod prelude {
    pub use crate::{
        DocumentMapper, DocumentReader, DocumentStore, MemoryStore, MongoDataAccess, MongoStore,
    };
    pub use sokoke_data::prelude::*;
}
