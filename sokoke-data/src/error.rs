/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// A single-record operation targeted a missing identifier.
    NotFound(String),
    /// A search or payload named a field the entity does not declare.
    UnknownField { entity: &'static str, field: String },
    /// The configured backend cannot express the requested operation.
    Unsupported(String),
    /// A stored record could not be converted into the entity.
    Mapping(String),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by the backend crates (`sokoke-data-sqlx`, `sokoke-data-mongodb`)
    /// to wrap driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        DataError::NotFound(format!("{entity} with id '{id}' not found"))
    }

    pub fn unknown_field(entity: &'static str, field: &str) -> Self {
        DataError::UnknownField {
            entity,
            field: field.to_string(),
        }
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        DataError::Mapping(msg.into())
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::UnknownField { entity, field } => {
                write!(f, "Unknown field '{field}' for {entity}")
            }
            DataError::Unsupported(msg) => write!(f, "Unsupported: {msg}"),
            DataError::Mapping(msg) => write!(f, "Mapping error: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
