use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sokoke_data::value::parse_timestamp;
use sokoke_data::{DataError, Entity};
use sqlx::any::AnyRow;
use sqlx::Row;

/// Converts a joined row into the canonical entity.
///
/// Columns of the entity itself are read under their column name; columns of
/// a joined relation are aliased `<relation>__<column>` and read through
/// [`RowReader::nested`].
pub trait RowMapper: Entity {
    fn from_row(row: &RowReader<'_>) -> Result<Self, DataError>;
}

/// Rows of to-many relations, by relation name then owner id.
pub type RelatedRows = HashMap<&'static str, HashMap<String, Vec<AnyRow>>>;

/// Typed, prefix-aware access to an [`AnyRow`].
///
/// A column missing from the row (because the search projected it away)
/// reads as null, and required getters fall back to the type's default.
pub struct RowReader<'r> {
    row: &'r AnyRow,
    prefix: String,
    related: Option<&'r RelatedRows>,
}

impl<'r> RowReader<'r> {
    pub fn new(row: &'r AnyRow) -> Self {
        Self {
            row,
            prefix: String::new(),
            related: None,
        }
    }

    /// A reader that also sees the loaded to-many relations of the row.
    pub fn with_related(row: &'r AnyRow, related: &'r RelatedRows) -> Self {
        Self {
            row,
            prefix: String::new(),
            related: Some(related),
        }
    }

    /// A reader over the columns of the joined relation `relation`.
    pub fn nested(&self, relation: &str) -> RowReader<'r> {
        RowReader {
            row: self.row,
            prefix: format!("{}{relation}__", self.prefix),
            related: None,
        }
    }

    /// Readers over the child rows of the to-many relation `relation`, keyed
    /// on this row's `id` column; `None` when the relation was not loaded.
    pub fn many(&self, relation: &str) -> Result<Option<Vec<RowReader<'r>>>, DataError> {
        let Some(loaded) = self.related.and_then(|r| r.get(relation)) else {
            return Ok(None);
        };
        let id = self.text("id")?;
        Ok(Some(
            loaded
                .get(&id)
                .map(|rows| rows.iter().map(RowReader::new).collect())
                .unwrap_or_default(),
        ))
    }

    fn column(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    fn get<T>(&self, name: &str) -> Result<Option<T>, DataError>
    where
        T: for<'a> sqlx::Decode<'a, sqlx::Any> + sqlx::Type<sqlx::Any>,
    {
        match self.row.try_get::<Option<T>, _>(self.column(name).as_str()) {
            Ok(v) => Ok(v),
            Err(sqlx::Error::ColumnNotFound(_)) => Ok(None),
            Err(e) => Err(DataError::mapping(format!("column '{}': {e}", self.column(name)))),
        }
    }

    pub fn optional_text(&self, name: &str) -> Result<Option<String>, DataError> {
        self.get::<String>(name)
    }

    pub fn text(&self, name: &str) -> Result<String, DataError> {
        Ok(self.optional_text(name)?.unwrap_or_default())
    }

    /// Integers arrive with the width the driver reports.
    pub fn optional_i64(&self, name: &str) -> Result<Option<i64>, DataError> {
        match self.get::<i64>(name) {
            Ok(v) => Ok(v),
            Err(_) => match self.get::<i32>(name) {
                Ok(v) => Ok(v.map(i64::from)),
                Err(_) => self.get::<i16>(name).map(|v| v.map(i64::from)),
            },
        }
    }

    pub fn i64(&self, name: &str) -> Result<i64, DataError> {
        Ok(self.optional_i64(name)?.unwrap_or_default())
    }

    pub fn optional_f64(&self, name: &str) -> Result<Option<f64>, DataError> {
        match self.get::<f64>(name) {
            Ok(v) => Ok(v),
            Err(_) => self.optional_i64(name).map(|v| v.map(|i| i as f64)),
        }
    }

    /// SQLite and MySQL store booleans as integers.
    pub fn bool(&self, name: &str) -> Result<bool, DataError> {
        match self.get::<bool>(name) {
            Ok(v) => Ok(v.unwrap_or_default()),
            Err(_) => Ok(self.optional_i64(name)?.unwrap_or_default() != 0),
        }
    }

    pub fn optional_timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>, DataError> {
        match self.optional_text(name)? {
            None => Ok(None),
            Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
                DataError::mapping(format!("column '{}': invalid timestamp '{raw}'", self.column(name)))
            }),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, DataError> {
        Ok(self.optional_timestamp(name)?.unwrap_or_default())
    }
}
