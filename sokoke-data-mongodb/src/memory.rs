use std::cmp::Ordering;

use async_trait::async_trait;
use bson::{Bson, Document};
use dashmap::DashMap;
use regex::RegexBuilder;
use sokoke_data::DataError;

use crate::error::{MongoErrorExt, MongoResult};
use crate::store::{DocumentStore, FindQuery};

/// In-process [`DocumentStore`].
///
/// Evaluates the filter subset the search compiler emits (`$and`, `$or`,
/// `$text`, `$regex`, comparisons, `$ne`, `$in`, `$exists` and equality)
/// and sorts with MongoDB's cross-type ordering. Collections keep insertion
/// order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`, ignoring any filter.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn matching(&self, collection: &str, filter: &Document) -> MongoResult<Vec<Document>> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for document in documents.iter() {
            if matches(document, filter)? {
                out.push(document.clone());
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, filter: Document) -> MongoResult<u64> {
        Ok(self.matching(collection, &filter)?.len() as u64)
    }

    async fn find(&self, collection: &str, query: FindQuery) -> MongoResult<Vec<Document>> {
        let mut documents = self.matching(collection, &query.filter)?;
        documents.sort_by(|a, b| compare_by(&query.sort, a, b));

        let skip = query.skip.unwrap_or(0) as usize;
        let documents = documents.into_iter().skip(skip);
        let documents: Vec<Document> = match query.limit {
            Some(limit) if limit > 0 => documents.take(limit as usize).collect(),
            _ => documents.collect(),
        };

        Ok(match &query.projection {
            Some(projection) => documents.iter().map(|d| project(d, projection)).collect(),
            None => documents,
        })
    }

    async fn find_one(&self, collection: &str, filter: Document) -> MongoResult<Option<Document>> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(None);
        };
        for document in documents.iter() {
            if matches(document, &filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn insert(&self, collection: &str, document: Document) -> MongoResult<()> {
        let mut documents = self.collections.entry(collection.to_string()).or_default();
        if let Some(id) = document.get("_id") {
            if documents.iter().any(|d| d.get("_id") == Some(id)) {
                return Err(DataError::Other(format!(
                    "duplicate key in collection '{collection}': _id {id}"
                )));
            }
        }
        documents.push(document);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> MongoResult<Option<Document>> {
        let Some(mut documents) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        for document in documents.iter_mut() {
            if matches(document, &filter)? {
                for (key, value) in &set {
                    document.insert(key.clone(), value.clone());
                }
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> MongoResult<Option<Document>> {
        let Some(mut documents) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let mut position = None;
        for (i, document) in documents.iter().enumerate() {
            if matches(document, &filter)? {
                position = Some(i);
                break;
            }
        }
        Ok(position.map(|i| documents.remove(i)))
    }
}

/// `true` when `document` satisfies `filter`.
pub fn matches(document: &Document, filter: &Document) -> MongoResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$text" => text_matches(document, condition)?,
            op if op.starts_with('$') => {
                return Err(DataError::Unsupported(format!("top-level operator {op}")));
            }
            field => field_matches(document.get(field), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, condition: &'a Bson) -> MongoResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(DataError::Other(format!("{op} needs an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(DataError::Other(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> MongoResult<bool> {
    let operators = match condition {
        Bson::Document(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => ops,
        _ => return Ok(equals(value, condition)),
    };

    for (op, operand) in operators {
        let ok = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compare(value, operand) == Some(Ordering::Greater),
            "$gte" => matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)),
            "$lt" => compare(value, operand) == Some(Ordering::Less),
            "$lte" => matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)),
            "$in" => match operand {
                Bson::Array(candidates) => candidates.iter().any(|c| equals(value, c)),
                _ => return Err(DataError::Other("$in needs an array".into())),
            },
            "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
            "$regex" => {
                let options = operators.get_str("$options").unwrap_or("");
                regex_matches(value, operand, options)?
            }
            "$options" => true,
            other => return Err(DataError::Unsupported(format!("operator {other}"))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn regex_matches(value: Option<&Bson>, pattern: &Bson, options: &str) -> MongoResult<bool> {
    let Some(Bson::String(text)) = value else {
        return Ok(false);
    };
    let Bson::String(pattern) = pattern else {
        return Err(DataError::Other("$regex needs a string pattern".into()));
    };
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .build()
        .map_err(|e| e.into_data_error())?;
    Ok(regex.is_match(text))
}

/// Word match over the document's top-level strings.
fn text_matches(document: &Document, condition: &Bson) -> MongoResult<bool> {
    let Bson::Document(condition) = condition else {
        return Err(DataError::Other("$text needs a document".into()));
    };
    let search = condition
        .get_str("$search")
        .map_err(|_| DataError::Other("$text needs $search".into()))?;
    let case_sensitive = condition.get_bool("$caseSensitive").unwrap_or(false);
    let fold = |s: &str| if case_sensitive { s.to_string() } else { s.to_lowercase() };

    let terms: Vec<String> = search.split_whitespace().map(fold).collect();
    if terms.is_empty() {
        return Ok(false);
    }
    Ok(document.values().any(|value| match value {
        Bson::String(text) => text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .any(|word| terms.contains(&fold(word))),
        _ => false,
    }))
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Equality with null matching a missing key and numbers compared by value.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None | Some(Bson::Null), Bson::Null) => true,
        (None, _) => false,
        (Some(actual), expected) => match (as_number(actual), as_number(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => actual == expected,
        },
    }
}

/// Ordering between values of the same type class; `None` across classes.
fn compare(value: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
    let value = value?;
    if type_rank(value) != type_rank(operand) || matches!(value, Bson::Null) {
        return None;
    }
    Some(compare_same_rank(value, operand))
}

/// MongoDB's BSON comparison order between types.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

fn compare_same_rank(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        _ => Ordering::Equal,
    }
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let a = a.unwrap_or(&Bson::Null);
    let b = b.unwrap_or(&Bson::Null);
    type_rank(a)
        .cmp(&type_rank(b))
        .then_with(|| compare_same_rank(a, b))
}

fn compare_by(sort: &Document, a: &Document, b: &Document) -> Ordering {
    for (key, direction) in sort {
        let ordering = compare_values(a.get(key), b.get(key));
        let descending = as_number(direction).map(|d| d < 0.0).unwrap_or(false);
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(document: &Document, projection: &Document) -> Document {
    let mut out = Document::new();
    for (key, value) in document {
        let kept = key == "_id"
            || projection
                .get(key)
                .map(|flag| flag.as_bool().unwrap_or_else(|| as_number(flag) != Some(0.0)))
                .unwrap_or(false);
        if kept {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    async fn store_with(documents: Vec<Document>) -> MemoryStore {
        let store = MemoryStore::new();
        for document in documents {
            store.insert("items", document).await.unwrap();
        }
        store
    }

    fn ids(documents: &[Document]) -> Vec<&str> {
        documents.iter().map(|d| d.get_str("_id").unwrap()).collect()
    }

    #[test]
    fn null_matches_missing_and_numbers_match_across_types() {
        let document = doc! { "_id": "a", "n": 3_i32, "s": "x" };
        assert!(matches(&document, &doc! { "missing": null }).unwrap());
        assert!(matches(&document, &doc! { "n": 3.0 }).unwrap());
        assert!(matches(&document, &doc! { "n": { "$gte": 3_i64, "$lte": 3.5 } }).unwrap());
        assert!(!matches(&document, &doc! { "s": { "$gt": 1 } }).unwrap());
        assert!(matches(&document, &doc! { "missing": { "$ne": true } }).unwrap());
    }

    #[test]
    fn logical_operators_and_regex() {
        let document = doc! { "_id": "a", "title": "Launch Plan" };
        let filter = doc! { "$and": [
            { "$or": [ { "title": { "$regex": "launch", "$options": "i" } }, { "_id": "zzz" } ] },
            { "_id": { "$in": ["a", "b"] } },
        ] };
        assert!(matches(&document, &filter).unwrap());
        assert!(!matches(&document, &doc! { "title": { "$regex": "launch", "$options": "" } }).unwrap());
        assert!(matches(&document, &doc! { "_id": { "$in": [] } }).is_ok_and(|m| !m));
    }

    #[test]
    fn text_search_matches_whole_words() {
        let document = doc! { "_id": "a", "title": "Quarterly launch-plan" };
        let text = |q: &str| doc! { "$text": { "$search": q, "$caseSensitive": false } };
        assert!(matches(&document, &text("LAUNCH")).unwrap());
        assert!(matches(&document, &text("nothing plan")).unwrap());
        assert!(!matches(&document, &text("laun")).unwrap());
    }

    #[test]
    fn unknown_operators_are_unsupported() {
        let document = doc! { "_id": "a" };
        assert!(matches!(
            matches(&document, &doc! { "_id": { "$where": "1" } }),
            Err(DataError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn find_sorts_with_nulls_first_then_pages_and_projects() {
        let store = store_with(vec![
            doc! { "_id": "a", "rank": 2, "label": "two" },
            doc! { "_id": "b", "label": "none" },
            doc! { "_id": "c", "rank": 1, "label": "one" },
            doc! { "_id": "d", "rank": 2.5, "label": "two and a half" },
        ])
        .await;

        let all = store
            .find("items", FindQuery { sort: doc! { "rank": 1 }, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ids(&all), vec!["b", "c", "a", "d"]);

        let page = store
            .find(
                "items",
                FindQuery {
                    sort: doc! { "rank": -1, "_id": 1 },
                    skip: Some(1),
                    limit: Some(2),
                    projection: Some(doc! { "_id": 1, "rank": 1 }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["a", "c"]);
        assert!(page.iter().all(|d| !d.contains_key("label")));
    }

    #[tokio::test]
    async fn update_and_delete_return_documents() {
        let store = store_with(vec![doc! { "_id": "a", "v": 1 }]).await;
        let updated = store
            .update_one("items", doc! { "_id": "a" }, doc! { "v": 2 })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get_i32("v").unwrap(), 2);

        assert!(store
            .update_one("items", doc! { "_id": "x" }, doc! { "v": 3 })
            .await
            .unwrap()
            .is_none());

        let removed = store.delete_one("items", doc! { "_id": "a" }).await.unwrap();
        assert_eq!(removed, Some(updated));
        assert!(store.is_empty("items"));
        assert_eq!(store.count("items", doc! {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = store_with(vec![doc! { "_id": "a" }]).await;
        assert!(store.insert("items", doc! { "_id": "a" }).await.is_err());
        assert_eq!(store.len("items"), 1);
    }
}
