use sokoke_data::DataError;

/// Extension trait for converting driver errors into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<mongodb::error::Error> for DataError`
/// in this crate. Use `.into_data_error()` instead.
pub trait MongoErrorExt {
    fn into_data_error(self) -> DataError;
}

impl MongoErrorExt for mongodb::error::Error {
    fn into_data_error(self) -> DataError {
        DataError::database(self)
    }
}

impl MongoErrorExt for bson::de::Error {
    fn into_data_error(self) -> DataError {
        DataError::Mapping(self.to_string())
    }
}

impl MongoErrorExt for regex::Error {
    fn into_data_error(self) -> DataError {
        DataError::Other(format!("Invalid regular expression: {self}"))
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type MongoResult<T> = Result<T, DataError>;
