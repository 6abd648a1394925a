use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Storage type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Id,
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    /// Identifier of a related record (a to-one relation).
    Reference,
}

/// A field of an entity, with its canonical name and per-backend storage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Canonical camelCase name used in search specifications.
    pub name: &'static str,
    /// Column in the relational table.
    pub column: &'static str,
    /// Key in the stored document.
    pub document: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(
        name: &'static str,
        column: &'static str,
        document: &'static str,
        kind: FieldKind,
    ) -> Self {
        Field {
            name,
            column,
            document,
            kind,
        }
    }

    /// The identifier field: `id` in tables, `_id` in documents.
    pub const fn id() -> Self {
        Field::new("id", "id", "_id", FieldKind::Id)
    }

    pub fn is_text(&self) -> bool {
        self.kind == FieldKind::Text
    }

    /// Stored as a string in every backend, so substring search applies.
    pub fn is_textual(&self) -> bool {
        matches!(self.kind, FieldKind::Id | FieldKind::Text | FieldKind::Reference)
    }
}

/// How a relation links the two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The owning entity stores the related id in the `Reference` field that
    /// carries the same name as the relation.
    ToOne,
    /// Every related record stores the owner's id in `foreign_key`, a
    /// canonical field name of the related entity.
    ToMany { foreign_key: &'static str },
}

/// A relation declared by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub table: &'static str,
    pub collection: &'static str,
    /// Fields of the related entity, the identifier included.
    pub fields: &'static [Field],
    pub kind: RelationKind,
}

impl Relation {
    pub const fn to_one(
        name: &'static str,
        table: &'static str,
        collection: &'static str,
        fields: &'static [Field],
    ) -> Self {
        Relation {
            name,
            table,
            collection,
            fields,
            kind: RelationKind::ToOne,
        }
    }

    /// Children are loaded with a separate query keyed on `foreign_key`, so
    /// pagination of the owner is unaffected.
    pub const fn to_many(
        name: &'static str,
        table: &'static str,
        collection: &'static str,
        fields: &'static [Field],
        foreign_key: &'static str,
    ) -> Self {
        Relation {
            name,
            table,
            collection,
            fields,
            kind: RelationKind::ToMany { foreign_key },
        }
    }

    pub fn is_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::ToMany { .. })
    }

    /// The related field holding the owner's id, for a to-many relation.
    pub fn foreign_key(&self) -> Option<&'static Field> {
        match self.kind {
            RelationKind::ToOne => None,
            RelationKind::ToMany { foreign_key } => {
                self.fields.iter().find(|f| f.name == foreign_key)
            }
        }
    }

    /// The related identifier field.
    pub fn id_field(&self) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.kind == FieldKind::Id)
    }
}

/// Trait implemented by every persisted entity.
///
/// The schema is static: the field and relation sets are fixed by the
/// entity's own code, and both backends compile searches against it.
///
/// # Example
///
/// ```ignore
/// impl Entity for Status {
///     type Create = NewStatus;
///     type Update = StatusChanges;
///     fn name() -> &'static str { "Status" }
///     fn table_name() -> &'static str { "statuses" }
///     fn collection_name() -> &'static str { "statuses" }
///     fn fields() -> &'static [Field] { STATUS_FIELDS }
///     fn id(&self) -> &str { &self.id }
///     // ...
/// }
/// ```
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Payload accepted by `create`.
    type Create: fmt::Debug + Send + Sync + 'static;
    /// Partial payload accepted by `update`.
    type Update: fmt::Debug + Send + Sync + 'static;

    /// Human-readable singular name, used in messages and as the binding key.
    fn name() -> &'static str;

    /// Plural form used in search messages.
    fn plural_name() -> String {
        format!("{}s", Self::name())
    }

    fn table_name() -> &'static str;
    fn collection_name() -> &'static str;
    fn fields() -> &'static [Field];

    fn relations() -> &'static [Relation] {
        &[]
    }

    /// Boolean field marking soft-deleted records, if the entity has one.
    fn archived_field() -> Option<&'static str> {
        None
    }

    fn id(&self) -> &str;

    /// Canonical field values to store on creation.
    ///
    /// `id`, `createdAt` and `updatedAt` are assigned by the backend.
    fn create_values(input: &Self::Create) -> Vec<(&'static str, Value)>;

    /// Canonical field values to change on update; absent fields are left alone.
    fn update_values(input: &Self::Update) -> Vec<(&'static str, Value)>;

    fn field(name: &str) -> Option<&'static Field> {
        Self::fields().iter().find(|f| f.name == name)
    }

    fn relation(name: &str) -> Option<&'static Relation> {
        Self::relations().iter().find(|r| r.name == name)
    }
}

/// A to-one relation value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    /// Only the identifier of the related record is known.
    Id(String),
    /// The related record was resolved.
    Populated(Box<T>),
}

impl<T: Entity> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Populated(entity) => entity.id(),
        }
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Populated(entity) => Some(entity),
        }
    }
}

impl<T> From<T> for Ref<T> {
    fn from(entity: T) -> Self {
        Ref::Populated(Box::new(entity))
    }
}
