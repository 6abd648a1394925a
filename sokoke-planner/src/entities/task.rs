use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sokoke_data::{DataError, Entity, Field, FieldKind, Value};
use sokoke_data_mongodb::{DocumentMapper, DocumentReader};
use sokoke_data_sqlx::{RowMapper, RowReader};

pub(crate) static TASK_FIELDS: &[Field] = &[
    Field::id(),
    Field::new("name", "name", "name", FieldKind::Text),
    Field::new("description", "description", "description", FieldKind::Text),
    Field::new("feature", "feature_id", "feature", FieldKind::Reference),
    Field::new("completed", "completed", "completed", FieldKind::Boolean),
    Field::new("priority", "priority", "priority", FieldKind::Integer),
    Field::new("createdAt", "created_at", "createdAt", FieldKind::Timestamp),
    Field::new("updatedAt", "updated_at", "updatedAt", FieldKind::Timestamp),
];

/// A unit of work belonging to at most one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    /// Id of the owning feature.
    pub feature: Option<String>,
    pub completed: bool,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub feature: Option<String>,
    pub completed: bool,
    pub priority: i64,
}

impl NewTask {
    pub fn new(name: &str, description: &str) -> Self {
        NewTask {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    pub fn for_feature(mut self, feature: &str) -> Self {
        self.feature = Some(feature.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub feature: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<i64>,
}

impl Entity for Task {
    type Create = NewTask;
    type Update = TaskChanges;

    fn name() -> &'static str {
        "Task"
    }

    fn table_name() -> &'static str {
        "tasks"
    }

    fn collection_name() -> &'static str {
        "tasks"
    }

    fn fields() -> &'static [Field] {
        TASK_FIELDS
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn create_values(input: &NewTask) -> Vec<(&'static str, Value)> {
        vec![
            ("name", input.name.clone().into()),
            ("description", input.description.clone().into()),
            ("feature", input.feature.clone().into()),
            ("completed", input.completed.into()),
            ("priority", input.priority.into()),
        ]
    }

    fn update_values(input: &TaskChanges) -> Vec<(&'static str, Value)> {
        let mut values = Vec::new();
        if let Some(name) = &input.name {
            values.push(("name", name.clone().into()));
        }
        if let Some(description) = &input.description {
            values.push(("description", description.clone().into()));
        }
        if let Some(feature) = &input.feature {
            values.push(("feature", feature.clone().into()));
        }
        if let Some(completed) = input.completed {
            values.push(("completed", completed.into()));
        }
        if let Some(priority) = input.priority {
            values.push(("priority", priority.into()));
        }
        values
    }
}

impl RowMapper for Task {
    fn from_row(row: &RowReader<'_>) -> Result<Self, DataError> {
        Ok(Task {
            id: row.text("id")?,
            name: row.text("name")?,
            description: row.text("description")?,
            feature: row.optional_text("feature_id")?,
            completed: row.bool("completed")?,
            priority: row.i64("priority")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}

impl DocumentMapper for Task {
    fn from_document(doc: &DocumentReader<'_>) -> Result<Self, DataError> {
        Ok(Task {
            id: doc.text("_id")?,
            name: doc.text("name")?,
            description: doc.text("description")?,
            feature: doc.optional_text("feature")?,
            completed: doc.bool("completed")?,
            priority: doc.i64("priority")?,
            created_at: doc.timestamp("createdAt")?,
            updated_at: doc.timestamp("updatedAt")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_point_at_their_feature() {
        let values = Task::create_values(&NewTask::new("Write docs", "").for_feature("f1"));
        assert!(values.contains(&("feature", Value::Text("f1".into()))));
        for (key, _) in values {
            assert!(Task::field(key).is_some(), "{key}");
        }
        assert_eq!(Task::field("feature").unwrap().column, "feature_id");
    }
}
