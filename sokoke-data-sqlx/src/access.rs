use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Instant;

use async_trait::async_trait;
use sokoke_data::value::{format_timestamp, now};
use sokoke_data::{
    DataAccess, DataError, Entity, QueryBuilder, QueryPlan, Relation, SearchMetadata,
    SearchResult, SearchSpec, Value,
};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Row};

use crate::compile::{children_select, compile_search, joined_select};
use crate::error::{SqlxErrorExt, SqlxResult};
use crate::row::{RelatedRows, RowMapper, RowReader};
use crate::store::SqlStore;

/// [`DataAccess`] for any relational dialect.
///
/// To-one relations are always joined. To-many relations are loaded with one
/// extra query per relation: always for single-record operations, on request
/// for `read_all`.
///
/// # Example
///
/// ```ignore
/// let store = SqlStore::connect("sqlite::memory:", Dialect::Sqlite, 1).await?;
/// let access: Arc<dyn DataAccess<Feature>> = Arc::new(SqlxDataAccess::<Feature>::new(store));
/// ```
pub struct SqlxDataAccess<E> {
    store: SqlStore,
    _marker: PhantomData<fn() -> E>,
}

impl<E> SqlxDataAccess<E> {
    pub fn new(store: SqlStore) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &SqlStore {
        &self.store
    }
}

impl<E> Clone for SqlxDataAccess<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: Vec<Value>,
) -> Query<'q, Any, AnyArguments<'q>> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(b),
            Value::Integer(i) => query.bind(i),
            Value::Float(f) => query.bind(f),
            Value::Text(s) => query.bind(s),
            Value::Timestamp(t) => query.bind(format_timestamp(&t)),
        };
    }
    query
}

/// Map canonical names to columns, coercing each value to the field's kind.
fn columns<E: Entity>(values: Vec<(&'static str, Value)>) -> SqlxResult<Vec<(&'static str, Value)>> {
    values
        .into_iter()
        .map(|(name, value)| {
            let field = E::field(name).ok_or_else(|| DataError::unknown_field(E::name(), name))?;
            Ok((field.column, value.coerce(field.kind)))
        })
        .collect()
}

fn column_of<E: Entity>(name: &str) -> SqlxResult<&'static str> {
    E::field(name)
        .map(|f| f.column)
        .ok_or_else(|| DataError::unknown_field(E::name(), name))
}

/// Owner ids bound per child query.
const CHILD_BATCH: usize = 500;

impl<E: RowMapper> SqlxDataAccess<E> {
    async fn fetch_by_id(&self, conn: &mut AnyConnection, id: &str) -> SqlxResult<Option<E>> {
        let id_field = format!("{}.{}", E::table_name(), column_of::<E>("id")?);
        let (sql, params) = joined_select::<E>(self.store.dialect(), |_| true)?
            .where_eq(&id_field, id)
            .build_select()?;
        let row: Option<AnyRow> = bind_all(sqlx::query(&sql), params)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| e.into_data_error())?;
        let Some(row) = row else {
            return Ok(None);
        };

        let to_many: Vec<&'static Relation> =
            E::relations().iter().filter(|r| r.is_to_many()).collect();
        let related = self
            .load_children(conn, std::slice::from_ref(&row), &to_many)
            .await?;
        E::from_row(&RowReader::with_related(&row, &related)).map(Some)
    }

    /// Fetch the children of `rows` for each to-many relation, grouped by
    /// owner id.
    async fn load_children(
        &self,
        conn: &mut AnyConnection,
        rows: &[AnyRow],
        relations: &[&'static Relation],
    ) -> SqlxResult<RelatedRows> {
        let mut related = RelatedRows::new();
        for relation in relations.iter().filter(|r| r.is_to_many()) {
            let foreign_key = relation
                .foreign_key()
                .ok_or_else(|| DataError::unknown_field(relation.name, "foreign key"))?;

            let mut owner_ids: Vec<String> = rows
                .iter()
                .map(|row| RowReader::new(row).optional_text("id"))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect();
            owner_ids.sort_unstable();
            owner_ids.dedup();

            let mut by_owner: HashMap<String, Vec<AnyRow>> = HashMap::new();
            for batch in owner_ids.chunks(CHILD_BATCH) {
                let ids = batch.iter().cloned().map(Value::Text).collect();
                let (sql, params) =
                    children_select(relation, self.store.dialect(), ids)?.build_select()?;
                let children = bind_all(sqlx::query(&sql), params)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| e.into_data_error())?;
                for child in children {
                    let owner = RowReader::new(&child).optional_text(foreign_key.column)?;
                    if let Some(owner) = owner {
                        by_owner.entry(owner).or_default().push(child);
                    }
                }
            }
            tracing::debug!(entity = E::name(), relation = relation.name, "children loaded");
            related.insert(relation.name, by_owner);
        }
        Ok(related)
    }

    async fn acquire(&self) -> SqlxResult<sqlx::pool::PoolConnection<Any>> {
        self.store
            .pool()
            .acquire()
            .await
            .map_err(|e| e.into_data_error())
    }
}

#[async_trait]
impl<E: RowMapper> DataAccess<E> for SqlxDataAccess<E> {
    async fn create(&self, input: E::Create) -> Result<E, DataError> {
        let id = uuid::Uuid::new_v4().to_string();
        let stamp = Value::Timestamp(now());

        let mut values = vec![
            ("id", Value::Text(id.clone())),
            ("createdAt", stamp.clone()),
            ("updatedAt", stamp),
        ];
        values.extend(E::create_values(&input));
        let values = columns::<E>(values)?;

        let (sql, params) = QueryBuilder::new_with_dialect(E::table_name(), self.store.dialect())
            .build_insert(&values)?;

        let mut conn = self.acquire().await?;
        bind_all(sqlx::query(&sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| e.into_data_error())?;
        tracing::debug!(entity = E::name(), id = %id, "row inserted");

        self.fetch_by_id(&mut conn, &id)
            .await?
            .ok_or_else(|| DataError::Other(format!("Error creating {}", E::name().to_lowercase())))
    }

    async fn read(&self, id: &str) -> Result<E, DataError> {
        let mut conn = self.acquire().await?;
        self.fetch_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DataError::not_found(E::name(), id))
    }

    async fn read_all(&self, spec: Option<&SearchSpec<E>>) -> Result<SearchResult<E>, DataError> {
        let plan = QueryPlan::resolve(spec)?;
        let compiled = compile_search::<E>(&plan, self.store.dialect())?;
        tracing::debug!(entity = E::name(), sql = %compiled.fetch.0, "compiled search");

        let started = Instant::now();
        let mut conn = self.acquire().await?;

        let (count_sql, count_params) = compiled.count;
        let total: i64 = bind_all(sqlx::query(&count_sql), count_params)
            .fetch_one(&mut *conn)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(|e| e.into_data_error())?;

        let (fetch_sql, fetch_params) = compiled.fetch;
        let rows = bind_all(sqlx::query(&fetch_sql), fetch_params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| e.into_data_error())?;
        let related = self.load_children(&mut conn, &rows, &plan.populate).await?;
        drop(conn);

        let items = rows
            .iter()
            .map(|row| E::from_row(&RowReader::with_related(row, &related)))
            .collect::<Result<Vec<_>, _>>()?;
        let metadata = SearchMetadata::new(total.max(0) as u64, plan.pagination, started.elapsed());
        Ok(SearchResult::new(items, metadata))
    }

    async fn update(&self, id: &str, input: E::Update) -> Result<E, DataError> {
        let mut values = E::update_values(&input);
        values.push(("updatedAt", Value::Timestamp(now())));
        let values = columns::<E>(values)?;

        let (sql, params) = QueryBuilder::new_with_dialect(E::table_name(), self.store.dialect())
            .where_eq(column_of::<E>("id")?, id)
            .build_update(&values)?;

        let mut conn = self.acquire().await?;
        let affected = bind_all(sqlx::query(&sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| e.into_data_error())?
            .rows_affected();
        if affected == 0 {
            return Err(DataError::not_found(E::name(), id));
        }

        self.fetch_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DataError::not_found(E::name(), id))
    }

    async fn delete(&self, id: &str) -> Result<E, DataError> {
        let mut tx = self
            .store
            .pool()
            .begin()
            .await
            .map_err(|e| e.into_data_error())?;

        let existing = self
            .fetch_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| DataError::not_found(E::name(), id))?;

        let (sql, params) = QueryBuilder::new_with_dialect(E::table_name(), self.store.dialect())
            .where_eq(column_of::<E>("id")?, id)
            .build_delete()?;
        bind_all(sqlx::query(&sql), params)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.into_data_error())?;

        tx.commit().await.map_err(|e| e.into_data_error())?;
        Ok(existing)
    }
}
