use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sokoke_data::value::now;
use sokoke_data::{DataError, Entity, Field, FieldKind, Ref, Relation, Value};
use sokoke_data_mongodb::{DocumentMapper, DocumentReader};
use sokoke_data_sqlx::{RowMapper, RowReader};

use super::status::{Status, STATUS_FIELDS};
use super::task::{Task, TASK_FIELDS};

static FEATURE_FIELDS: &[Field] = &[
    Field::id(),
    Field::new("name", "name", "name", FieldKind::Text),
    Field::new("description", "description", "description", FieldKind::Text),
    Field::new("status", "status_id", "status", FieldKind::Reference),
    Field::new("lastCheckStatus", "last_check_status", "lastCheckStatus", FieldKind::Timestamp),
    Field::new("completed", "completed", "completed", FieldKind::Boolean),
    Field::new("priority", "priority", "priority", FieldKind::Integer),
    Field::new("archived", "archived", "archived", FieldKind::Boolean),
    Field::new("createdAt", "created_at", "createdAt", FieldKind::Timestamp),
    Field::new("updatedAt", "updated_at", "updatedAt", FieldKind::Timestamp),
];

static FEATURE_RELATIONS: &[Relation] = &[
    Relation::to_one("status", "statuses", "statuses", STATUS_FIELDS),
    Relation::to_many("tasks", "tasks", "tasks", TASK_FIELDS, "feature"),
];

/// A deliverable tracked on the planner board.
///
/// Archived features stay stored but are left out of searches unless the
/// search asks for deleted records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: Option<Ref<Status>>,
    pub last_check_status: Option<DateTime<Utc>>,
    /// Tasks of the feature, ordered by id; `None` when they were not loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    pub completed: bool,
    pub priority: i64,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeature {
    pub name: String,
    pub description: String,
    /// Id of the status.
    pub status: Option<String>,
    pub last_check_status: Option<DateTime<Utc>>,
    pub completed: bool,
    pub priority: i64,
}

impl NewFeature {
    pub fn new(name: &str, description: &str) -> Self {
        NewFeature {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub last_check_status: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub priority: Option<i64>,
    pub archived: Option<bool>,
}

impl Entity for Feature {
    type Create = NewFeature;
    type Update = FeatureChanges;

    fn name() -> &'static str {
        "Feature"
    }

    fn table_name() -> &'static str {
        "features"
    }

    fn collection_name() -> &'static str {
        "features"
    }

    fn fields() -> &'static [Field] {
        FEATURE_FIELDS
    }

    fn relations() -> &'static [Relation] {
        FEATURE_RELATIONS
    }

    fn archived_field() -> Option<&'static str> {
        Some("archived")
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn create_values(input: &NewFeature) -> Vec<(&'static str, Value)> {
        vec![
            ("name", input.name.clone().into()),
            ("description", input.description.clone().into()),
            ("status", input.status.clone().into()),
            ("lastCheckStatus", input.last_check_status.unwrap_or_else(now).into()),
            ("completed", input.completed.into()),
            ("priority", input.priority.into()),
            ("archived", false.into()),
        ]
    }

    fn update_values(input: &FeatureChanges) -> Vec<(&'static str, Value)> {
        let mut values = Vec::new();
        if let Some(name) = &input.name {
            values.push(("name", name.clone().into()));
        }
        if let Some(description) = &input.description {
            values.push(("description", description.clone().into()));
        }
        if let Some(status) = &input.status {
            values.push(("status", status.clone().into()));
        }
        if let Some(at) = input.last_check_status {
            values.push(("lastCheckStatus", at.into()));
        }
        if let Some(completed) = input.completed {
            values.push(("completed", completed.into()));
        }
        if let Some(priority) = input.priority {
            values.push(("priority", priority.into()));
        }
        if let Some(archived) = input.archived {
            values.push(("archived", archived.into()));
        }
        values
    }
}

impl RowMapper for Feature {
    fn from_row(row: &RowReader<'_>) -> Result<Self, DataError> {
        let status = match row.optional_text("status_id")? {
            None => None,
            Some(id) => {
                let joined = row.nested("status");
                if joined.optional_text("id")?.is_some() {
                    Some(Ref::Populated(Box::new(Status::from_row(&joined)?)))
                } else {
                    Some(Ref::Id(id))
                }
            }
        };
        Ok(Feature {
            id: row.text("id")?,
            name: row.text("name")?,
            description: row.text("description")?,
            status,
            last_check_status: row.optional_timestamp("last_check_status")?,
            tasks: row
                .many("tasks")?
                .map(|rows| rows.iter().map(Task::from_row).collect::<Result<Vec<_>, _>>())
                .transpose()?,
            completed: row.bool("completed")?,
            priority: row.i64("priority")?,
            archived: row.bool("archived")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}

impl DocumentMapper for Feature {
    fn from_document(doc: &DocumentReader<'_>) -> Result<Self, DataError> {
        let status = match doc.nested("status") {
            Some(embedded) => Some(Ref::Populated(Box::new(Status::from_document(&embedded)?))),
            None => doc.optional_text("status")?.map(Ref::Id),
        };
        Ok(Feature {
            id: doc.text("_id")?,
            name: doc.text("name")?,
            description: doc.text("description")?,
            status,
            last_check_status: doc.optional_timestamp("lastCheckStatus")?,
            tasks: doc
                .many("tasks")?
                .map(|docs| docs.iter().map(Task::from_document).collect::<Result<Vec<_>, _>>())
                .transpose()?,
            completed: doc.bool("completed")?,
            priority: doc.i64("priority")?,
            archived: doc.bool("archived")?,
            created_at: doc.timestamp("createdAt")?,
            updated_at: doc.timestamp("updatedAt")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_features_start_unarchived_and_checked_now() {
        let values = Feature::create_values(&NewFeature::new("Export", "CSV export").with_priority(2));
        let get = |key: &str| values.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone());
        assert_eq!(get("archived"), Some(Value::Bool(false)));
        assert_eq!(get("status"), Some(Value::Null));
        assert_eq!(get("priority"), Some(Value::Integer(2)));
        assert!(matches!(get("lastCheckStatus"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn status_relation_is_backed_by_a_reference_field() {
        let relation = Feature::relation("status").unwrap();
        let field = Feature::field(relation.name).unwrap();
        assert_eq!(field.kind, FieldKind::Reference);
        assert_eq!(field.column, "status_id");
        assert_eq!(relation.fields, Status::fields());
    }

    #[test]
    fn serialises_with_planner_field_names() {
        let at = "2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let feature = Feature {
            id: "f1".into(),
            name: "Export".into(),
            description: String::new(),
            status: Some(Ref::Id("s1".into())),
            last_check_status: None,
            tasks: None,
            completed: false,
            priority: 0,
            archived: false,
            created_at: at,
            updated_at: at,
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["_id"], "f1");
        assert_eq!(json["status"], "s1");
        assert!(json.get("lastCheckStatus").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("tasks").is_none());
    }

    #[test]
    fn tasks_relation_is_keyed_on_the_task_side() {
        let relation = Feature::relation("tasks").unwrap();
        assert!(relation.is_to_many());
        assert!(Feature::field("tasks").is_none());
        assert_eq!(relation.foreign_key().unwrap().column, "feature_id");
    }
}
