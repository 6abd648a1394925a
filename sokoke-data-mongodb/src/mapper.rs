use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use sokoke_data::value::parse_timestamp;
use sokoke_data::{DataError, Entity};

/// Converts a stored document into the canonical entity.
///
/// A populated to-one relation is stored in place of its reference id as an
/// embedded document; [`DocumentReader::nested`] reads it. A populated
/// to-many relation is an array of documents under the relation name, read
/// with [`DocumentReader::many`].
pub trait DocumentMapper: Entity {
    fn from_document(doc: &DocumentReader<'_>) -> Result<Self, DataError>;
}

/// Typed access to a [`Document`].
///
/// A key missing from the document (because the search projected it away)
/// reads as null, and required getters fall back to the type's default.
pub struct DocumentReader<'d> {
    doc: &'d Document,
}

impl<'d> DocumentReader<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    fn get(&self, key: &str) -> Option<&'d Bson> {
        match self.doc.get(key) {
            None | Some(Bson::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn mismatch(&self, key: &str, expected: &str, found: &Bson) -> DataError {
        DataError::mapping(format!(
            "key '{key}': expected {expected}, found {:?}",
            found.element_type()
        ))
    }

    /// The embedded document under `key`, when the relation was populated.
    pub fn nested(&self, key: &str) -> Option<DocumentReader<'d>> {
        match self.get(key) {
            Some(Bson::Document(doc)) => Some(DocumentReader { doc }),
            _ => None,
        }
    }

    /// The embedded documents under `key`; `None` when the relation was not
    /// loaded.
    pub fn many(&self, key: &str) -> Result<Option<Vec<DocumentReader<'d>>>, DataError> {
        match self.get(key) {
            None => Ok(None),
            Some(Bson::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Bson::Document(doc) => Ok(DocumentReader { doc }),
                    other => Err(self.mismatch(key, "embedded document", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(self.mismatch(key, "array", other)),
        }
    }

    pub fn optional_text(&self, key: &str) -> Result<Option<String>, DataError> {
        match self.get(key) {
            None => Ok(None),
            Some(Bson::String(s)) => Ok(Some(s.clone())),
            Some(Bson::ObjectId(oid)) => Ok(Some(oid.to_hex())),
            Some(other) => Err(self.mismatch(key, "string", other)),
        }
    }

    pub fn text(&self, key: &str) -> Result<String, DataError> {
        Ok(self.optional_text(key)?.unwrap_or_default())
    }

    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>, DataError> {
        match self.get(key) {
            None => Ok(None),
            Some(Bson::Int32(i)) => Ok(Some(i64::from(*i))),
            Some(Bson::Int64(i)) => Ok(Some(*i)),
            Some(Bson::Double(f)) if f.fract() == 0.0 => Ok(Some(*f as i64)),
            Some(other) => Err(self.mismatch(key, "integer", other)),
        }
    }

    pub fn i64(&self, key: &str) -> Result<i64, DataError> {
        Ok(self.optional_i64(key)?.unwrap_or_default())
    }

    pub fn optional_f64(&self, key: &str) -> Result<Option<f64>, DataError> {
        match self.get(key) {
            None => Ok(None),
            Some(Bson::Int32(i)) => Ok(Some(f64::from(*i))),
            Some(Bson::Int64(i)) => Ok(Some(*i as f64)),
            Some(Bson::Double(f)) => Ok(Some(*f)),
            Some(other) => Err(self.mismatch(key, "number", other)),
        }
    }

    pub fn bool(&self, key: &str) -> Result<bool, DataError> {
        match self.get(key) {
            None => Ok(false),
            Some(Bson::Boolean(b)) => Ok(*b),
            Some(Bson::Int32(i)) => Ok(*i != 0),
            Some(Bson::Int64(i)) => Ok(*i != 0),
            Some(other) => Err(self.mismatch(key, "boolean", other)),
        }
    }

    pub fn optional_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, DataError> {
        match self.get(key) {
            None => Ok(None),
            Some(Bson::DateTime(dt)) => Ok(Some(dt.to_chrono())),
            Some(Bson::String(s)) => parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| DataError::mapping(format!("key '{key}': invalid timestamp '{s}'"))),
            Some(other) => Err(self.mismatch(key, "date", other)),
        }
    }

    pub fn timestamp(&self, key: &str) -> Result<DateTime<Utc>, DataError> {
        Ok(self.optional_timestamp(key)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn reads_typed_values_and_defaults_missing_keys() {
        let stamp = bson::DateTime::from_millis(1_700_000_000_123);
        let document = doc! {
            "_id": "a1",
            "count": 4_i32,
            "ratio": 2_i64,
            "done": true,
            "at": stamp,
            "empty": null,
            "owner": { "_id": "o1", "name": "Ops" },
        };
        let reader = DocumentReader::new(&document);
        assert_eq!(reader.text("_id").unwrap(), "a1");
        assert_eq!(reader.i64("count").unwrap(), 4);
        assert_eq!(reader.optional_f64("ratio").unwrap(), Some(2.0));
        assert!(reader.bool("done").unwrap());
        assert_eq!(reader.timestamp("at").unwrap(), stamp.to_chrono());
        assert_eq!(reader.optional_text("empty").unwrap(), None);
        assert_eq!(reader.i64("missing").unwrap(), 0);
        assert_eq!(reader.nested("owner").unwrap().text("name").unwrap(), "Ops");
        assert!(reader.nested("_id").is_none());
    }

    #[test]
    fn many_reads_embedded_arrays() {
        let document = doc! {
            "tasks": [{ "_id": "t1" }, { "_id": "t2" }],
            "empty": [],
            "ids": ["t1"],
        };
        let reader = DocumentReader::new(&document);
        let tasks = reader.many("tasks").unwrap().unwrap();
        let ids: Vec<String> = tasks.iter().map(|t| t.text("_id").unwrap()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert!(reader.many("empty").unwrap().unwrap().is_empty());
        assert!(reader.many("missing").unwrap().is_none());
        assert!(matches!(reader.many("ids"), Err(DataError::Mapping(_))));
    }

    #[test]
    fn type_mismatches_are_mapping_errors() {
        let document = doc! { "count": "four" };
        let reader = DocumentReader::new(&document);
        assert!(matches!(reader.i64("count"), Err(DataError::Mapping(_))));
        assert!(matches!(reader.timestamp("count"), Err(DataError::Mapping(_))));
    }
}
