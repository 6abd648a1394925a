//! Compilation of a [`QueryPlan`] into a MongoDB filter, sort and projection.

use bson::{doc, Bson, Document};
use sokoke_data::{Entity, Predicate, QueryPlan, SearchPlan, SortOrder, Value};

use crate::store::FindQuery;

/// Characters that carry meaning in a regular expression.
const REGEX_SPECIAL: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Compile a resolved search for entity `E`.
///
/// The returned query carries the filter used for both the count and the
/// fetch; skip and limit are only set when the plan is paginated.
pub fn compile_search<E: Entity>(plan: &QueryPlan) -> FindQuery {
    let mut clauses: Vec<Document> = Vec::new();
    merge_predicates(&plan.predicates, &mut clauses);
    if let Some(search) = &plan.search {
        clauses.push(search_clause::<E>(search));
    }

    let filter = match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses },
    };

    let mut sort = Document::new();
    for (field, order) in &plan.sort {
        let direction = if *order == SortOrder::Asc { 1 } else { -1 };
        sort.insert(field.document, direction);
    }

    let projection = plan.select.as_ref().map(|fields| {
        let mut projection = doc! { "_id": 1 };
        for field in fields {
            projection.insert(field.document, 1);
        }
        projection
    });

    FindQuery {
        filter,
        sort,
        skip: plan.pagination.map(|p| p.offset()),
        limit: plan.pagination.map(|p| p.limit() as i64),
        projection,
    }
}

/// Fold predicates into per-field clauses.
///
/// Operators on the same key share one clause; an operator already present
/// for that key starts a new clause so nothing is overwritten.
fn merge_predicates(predicates: &[Predicate], clauses: &mut Vec<Document>) {
    let start = clauses.len();
    for predicate in predicates {
        let key = predicate.field().document;
        let (operator, value) = match predicate {
            Predicate::Eq(_, v) => (None, to_bson(v)),
            Predicate::NotEq(_, v) => (Some("$ne"), to_bson(v)),
            Predicate::Gte(_, v) => (Some("$gte"), to_bson(v)),
            Predicate::Lte(_, v) => (Some("$lte"), to_bson(v)),
        };

        let Some(operator) = operator else {
            clauses.push(doc! { key: value });
            continue;
        };

        let slot = clauses[start..].iter_mut().find_map(|clause| match clause.get_mut(key) {
            Some(Bson::Document(ops)) if !ops.contains_key(operator) && is_operator_doc(ops) => {
                Some(ops)
            }
            _ => None,
        });
        match slot {
            Some(ops) => {
                ops.insert(operator, value);
            }
            None => clauses.push(doc! { key: { operator: value } }),
        }
    }
}

fn is_operator_doc(doc: &Document) -> bool {
    doc.keys().all(|k| k.starts_with('$'))
}

fn search_clause<E: Entity>(search: &SearchPlan) -> Document {
    let Some(fields) = &search.fields else {
        return doc! {
            "$text": { "$search": search.query.as_str(), "$caseSensitive": search.case_sensitive }
        };
    };

    let pattern = if search.use_regex {
        search.query.clone()
    } else {
        escape_regex(&search.query)
    };
    let options = if search.case_sensitive { "" } else { "i" };

    let alternatives: Vec<Document> = fields
        .iter()
        .filter(|f| f.is_textual())
        .map(|f| doc! { f.document: { "$regex": pattern.as_str(), "$options": options } })
        .collect();
    if alternatives.is_empty() {
        // Nothing textual to search: match no document.
        return doc! { "_id": { "$in": [] } };
    }
    doc! { "$or": alternatives }
}

/// Escape `raw` so it matches literally inside a regular expression.
pub fn escape_regex(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if REGEX_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Convert a plan value to its stored BSON form.
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Integer(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::Text(s) => Bson::String(s.clone()),
        Value::Timestamp(t) => Bson::DateTime(bson::DateTime::from_chrono(*t)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sokoke_data::{Field, FieldKind, SearchSpec, TextSearch};

    static TASK_FIELDS: &[Field] = &[
        Field::id(),
        Field::new("title", "title", "title", FieldKind::Text),
        Field::new("effort", "effort", "effort", FieldKind::Integer),
        Field::new("archived", "archived", "archived", FieldKind::Boolean),
        Field::new("createdAt", "created_at", "createdAt", FieldKind::Timestamp),
        Field::new("updatedAt", "updated_at", "updatedAt", FieldKind::Timestamp),
    ];

    #[derive(Debug, Clone)]
    struct Task {
        id: String,
    }

    impl Entity for Task {
        type Create = ();
        type Update = ();
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
        fn archived_field() -> Option<&'static str> {
            Some("archived")
        }
        fn id(&self) -> &str {
            &self.id
        }
        fn create_values(_: &()) -> Vec<(&'static str, Value)> {
            Vec::new()
        }
        fn update_values(_: &()) -> Vec<(&'static str, Value)> {
            Vec::new()
        }
    }

    fn compile(spec: Option<&SearchSpec<Task>>) -> FindQuery {
        compile_search::<Task>(&QueryPlan::resolve(spec).unwrap())
    }

    #[test]
    fn absent_spec_hides_archived_and_sorts_by_update() {
        let query = compile(None);
        assert_eq!(query.filter, doc! { "archived": { "$ne": true } });
        assert_eq!(query.sort, doc! { "updatedAt": -1, "_id": 1 });
        assert_eq!(query.skip, None);
        assert_eq!(query.limit, None);
        assert_eq!(query.projection, None);
    }

    #[test]
    fn ranges_merge_per_field() {
        let spec = SearchSpec::<Task>::new()
            .numeric_range("effort", Some(2.0), Some(5.0))
            .include_deleted(true);
        let query = compile(Some(&spec));
        assert_eq!(
            query.filter,
            doc! { "effort": { "$gte": 2.0, "$lte": 5.0 } }
        );
    }

    #[test]
    fn several_clauses_use_explicit_and() {
        let spec = SearchSpec::<Task>::new()
            .filter("title", "x")
            .search(TextSearch::new("a.b").in_fields(&["title", "effort"]))
            .paginate(3, 20);
        let query = compile(Some(&spec));
        assert_eq!(
            query.filter,
            doc! { "$and": [
                { "title": "x" },
                { "archived": { "$ne": true } },
                { "$or": [ { "title": { "$regex": "a\\.b", "$options": "i" } } ] },
            ] }
        );
        assert_eq!(query.skip, Some(40));
        assert_eq!(query.limit, Some(20));
    }

    #[test]
    fn search_without_fields_uses_text_index() {
        let spec = SearchSpec::<Task>::new()
            .search(TextSearch::new("launch").case_sensitive(true))
            .include_deleted(true);
        let query = compile(Some(&spec));
        assert_eq!(
            query.filter,
            doc! { "$text": { "$search": "launch", "$caseSensitive": true } }
        );
    }

    #[test]
    fn regex_queries_pass_through_unescaped() {
        let spec = SearchSpec::<Task>::new()
            .search(TextSearch::new("^Item [0-9]$").in_fields(&["title"]).regex(true).case_sensitive(true))
            .include_deleted(true);
        let query = compile(Some(&spec));
        assert_eq!(
            query.filter,
            doc! { "$or": [ { "title": { "$regex": "^Item [0-9]$", "$options": "" } } ] }
        );
    }

    #[test]
    fn projection_keeps_identifier() {
        let spec = SearchSpec::<Task>::new().select(&["title"]);
        let query = compile(Some(&spec));
        assert_eq!(query.projection, Some(doc! { "_id": 1, "title": 1 }));
    }

    #[test]
    fn escapes_every_special_character() {
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("(x|y)[z]{1}"), "\\(x\\|y\\)\\[z\\]\\{1\\}");
        assert_eq!(escape_regex("\\^$+?"), "\\\\\\^\\$\\+\\?");
        assert_eq!(escape_regex("plain"), "plain");
    }
}
