use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sokoke_data::{DataError, Entity, Field, FieldKind, Value};
use sokoke_data_mongodb::{DocumentMapper, DocumentReader};
use sokoke_data_sqlx::{RowMapper, RowReader};

pub(crate) static STATUS_FIELDS: &[Field] = &[
    Field::id(),
    Field::new("name", "name", "name", FieldKind::Text),
    Field::new("description", "description", "description", FieldKind::Text),
    Field::new("bgColor", "bg_color", "bgColor", FieldKind::Text),
    Field::new("textColor", "text_color", "textColor", FieldKind::Text),
    Field::new("accentColor", "accent_color", "accentColor", FieldKind::Text),
    Field::new("createdAt", "created_at", "createdAt", FieldKind::Timestamp),
    Field::new("updatedAt", "updated_at", "updatedAt", FieldKind::Timestamp),
];

pub const DEFAULT_BG_COLOR: &str = "#ffffff";
pub const DEFAULT_TEXT_COLOR: &str = "#000000";
pub const DEFAULT_ACCENT_COLOR: &str = "#ff6600";

/// A workflow state a feature can be in, with its display colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub bg_color: String,
    pub text_color: String,
    pub accent_color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStatus {
    pub name: String,
    pub description: String,
    pub bg_color: Option<String>,
    pub text_color: Option<String>,
    pub accent_color: Option<String>,
}

impl NewStatus {
    pub fn new(name: &str, description: &str) -> Self {
        NewStatus {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub bg_color: Option<String>,
    pub text_color: Option<String>,
    pub accent_color: Option<String>,
}

impl Entity for Status {
    type Create = NewStatus;
    type Update = StatusChanges;

    fn name() -> &'static str {
        "Status"
    }

    fn plural_name() -> String {
        "Statuses".to_string()
    }

    fn table_name() -> &'static str {
        "statuses"
    }

    fn collection_name() -> &'static str {
        "statuses"
    }

    fn fields() -> &'static [Field] {
        STATUS_FIELDS
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn create_values(input: &NewStatus) -> Vec<(&'static str, Value)> {
        let color = |c: &Option<String>, default: &str| c.clone().unwrap_or_else(|| default.to_string());
        vec![
            ("name", input.name.clone().into()),
            ("description", input.description.clone().into()),
            ("bgColor", color(&input.bg_color, DEFAULT_BG_COLOR).into()),
            ("textColor", color(&input.text_color, DEFAULT_TEXT_COLOR).into()),
            ("accentColor", color(&input.accent_color, DEFAULT_ACCENT_COLOR).into()),
        ]
    }

    fn update_values(input: &StatusChanges) -> Vec<(&'static str, Value)> {
        [
            ("name", &input.name),
            ("description", &input.description),
            ("bgColor", &input.bg_color),
            ("textColor", &input.text_color),
            ("accentColor", &input.accent_color),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, Value::Text(v))))
        .collect()
    }
}

impl RowMapper for Status {
    fn from_row(row: &RowReader<'_>) -> Result<Self, DataError> {
        Ok(Status {
            id: row.text("id")?,
            name: row.text("name")?,
            description: row.text("description")?,
            bg_color: row.text("bg_color")?,
            text_color: row.text("text_color")?,
            accent_color: row.text("accent_color")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }
}

impl DocumentMapper for Status {
    fn from_document(doc: &DocumentReader<'_>) -> Result<Self, DataError> {
        Ok(Status {
            id: doc.text("_id")?,
            name: doc.text("name")?,
            description: doc.text("description")?,
            bg_color: doc.text("bgColor")?,
            text_color: doc.text("textColor")?,
            accent_color: doc.text("accentColor")?,
            created_at: doc.timestamp("createdAt")?,
            updated_at: doc.timestamp("updatedAt")?,
        })
    }
}
