//! # sokoke-data
//!
//! Backend-neutral data access for the Sokoke planner: the search DSL, the
//! entity schema both backends compile against, the result envelope, the
//! per-entity [`DataAccess`] contract and the [`Repository`] wrapper that is
//! the only surface higher layers call.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SearchSpec`] | What to fetch: filters, text search, ranges, sort, pagination |
//! | [`parse_spec`] | Builds a `SearchSpec` from HTTP-style string parameters |
//! | [`QueryPlan`] | A spec validated and normalised against an entity schema |
//! | [`SearchResult`] | Items plus [`SearchMetadata`] |
//! | [`DataAccess`] | Implemented once per backend family |
//! | [`Repository`] | Wraps every call in a [`RepositoryResult`] |
//! | [`Bindings`] | Entity name to bound `DataAccess`, fixed at startup |
//! | [`QueryBuilder`] | Parameterised SQL for the relational backends |

pub mod access;
pub mod binding;
pub mod entity;
pub mod error;
pub mod page;
pub mod params;
pub mod plan;
pub mod query;
pub mod repository;
pub mod search;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use access::DataAccess;
pub use binding::{Bindings, BindingsBuilder};
pub use entity::{Entity, Field, FieldKind, Ref, Relation, RelationKind};
pub use error::DataError;
pub use page::{SearchMetadata, SearchResult};
pub use params::{parse_query, parse_spec};
pub use plan::{Predicate, QueryPlan, SearchPlan};
pub use query::{Condition, Dialect, QueryBuilder, QueryError};
pub use repository::{Repository, RepositoryResult};
pub use search::{
    Advanced, DateRange, NumericRange, Pagination, SearchOptions, SearchSpec, SortField,
    SortOrder, TextSearch,
};
pub use value::Value;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        DataAccess, DataError, Entity, Ref, Repository, RepositoryResult, SearchResult,
        SearchSpec, SortOrder, TextSearch, Value,
    };
}
