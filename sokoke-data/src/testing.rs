//! Test fixtures shared by the unit tests of this crate.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::access::DataAccess;
use crate::entity::{Entity, Field, FieldKind, Relation};
use crate::error::DataError;
use crate::page::{SearchMetadata, SearchResult};
use crate::plan::QueryPlan;
use crate::search::SearchSpec;
use crate::value::{now, Value};

pub static WIDGET_FIELDS: &[Field] = &[
    Field::id(),
    Field::new("name", "name", "name", FieldKind::Text),
    Field::new("description", "description", "description", FieldKind::Text),
    Field::new("weight", "weight", "weight", FieldKind::Integer),
    Field::new("archived", "archived", "archived", FieldKind::Boolean),
    Field::new("owner", "owner_id", "owner", FieldKind::Reference),
    Field::new("createdAt", "created_at", "createdAt", FieldKind::Timestamp),
    Field::new("updatedAt", "updated_at", "updatedAt", FieldKind::Timestamp),
];

static OWNER_FIELDS: &[Field] = &[
    Field::id(),
    Field::new("name", "name", "name", FieldKind::Text),
];

pub static WIDGET_RELATIONS: &[Relation] = &[Relation::to_one("owner", "owners", "owners", OWNER_FIELDS)];

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: String,
    pub name: String,
    pub weight: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewWidget {
    pub name: String,
    pub weight: i64,
}

#[derive(Debug)]
pub struct WidgetChanges {
    pub name: Option<String>,
}

impl Entity for Widget {
    type Create = NewWidget;
    type Update = WidgetChanges;

    fn name() -> &'static str {
        "Widget"
    }

    fn table_name() -> &'static str {
        "widgets"
    }

    fn collection_name() -> &'static str {
        "widgets"
    }

    fn fields() -> &'static [Field] {
        WIDGET_FIELDS
    }

    fn relations() -> &'static [Relation] {
        WIDGET_RELATIONS
    }

    fn archived_field() -> Option<&'static str> {
        Some("archived")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn create_values(input: &NewWidget) -> Vec<(&'static str, Value)> {
        vec![
            ("name", input.name.clone().into()),
            ("weight", input.weight.into()),
        ]
    }

    fn update_values(input: &WidgetChanges) -> Vec<(&'static str, Value)> {
        let mut values = Vec::new();
        if let Some(name) = &input.name {
            values.push(("name", name.clone().into()));
        }
        values
    }
}

/// A minimal data access that keeps widgets in a vector and ignores filters.
#[derive(Default)]
pub struct InMemoryWidgets {
    rows: Mutex<Vec<Widget>>,
}

impl InMemoryWidgets {
    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<Widget>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DataAccess<Widget> for InMemoryWidgets {
    async fn create(&self, input: NewWidget) -> Result<Widget, DataError> {
        let mut rows = self.rows();
        let stamp = now();
        let widget = Widget {
            id: format!("w{}", rows.len() + 1),
            name: input.name,
            weight: input.weight,
            created_at: stamp,
            updated_at: stamp,
        };
        rows.push(widget.clone());
        Ok(widget)
    }

    async fn read(&self, id: &str) -> Result<Widget, DataError> {
        self.rows()
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| DataError::not_found("Widget", id))
    }

    async fn read_all(
        &self,
        spec: Option<&SearchSpec<Widget>>,
    ) -> Result<SearchResult<Widget>, DataError> {
        let plan = QueryPlan::resolve(spec)?;
        let items = self.rows().clone();
        let metadata = SearchMetadata::new(items.len() as u64, plan.pagination, Duration::ZERO);
        Ok(SearchResult::new(items, metadata))
    }

    async fn update(&self, id: &str, input: WidgetChanges) -> Result<Widget, DataError> {
        let mut rows = self.rows();
        let widget = rows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| DataError::not_found("Widget", id))?;
        if let Some(name) = input.name {
            widget.name = name;
        }
        widget.updated_at = now();
        Ok(widget.clone())
    }

    async fn delete(&self, id: &str) -> Result<Widget, DataError> {
        let mut rows = self.rows();
        let idx = rows
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| DataError::not_found("Widget", id))?;
        Ok(rows.remove(idx))
    }
}
