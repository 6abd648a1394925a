//! Parsing of HTTP-style string parameters into a [`SearchSpec`].

use std::collections::HashMap;

use crate::search::{Pagination, SearchSpec, SortField, SortOrder, TextSearch, DEFAULT_LIMIT};
use crate::value::{parse_timestamp, Value};

/// Parameter names with a structured meaning. Everything else is a filter candidate.
pub const RESERVED_PARAMS: &[&str] = &[
    "page",
    "limit",
    "sort",
    "search",
    "searchFields",
    "caseSensitive",
    "useRegex",
    "fuzzyTolerance",
    "dateFrom",
    "dateTo",
    "dateField",
    "numMin",
    "numMax",
    "numField",
    "includeDeleted",
    "select",
    "populate",
];

const DEFAULT_DATE_FIELD: &str = "createdAt";

/// Build a search specification from raw string parameters.
///
/// Non-reserved parameters become equality filters only when their name is
/// in `allowed_filter_fields`. Returns `None` when nothing recognised was
/// supplied.
pub fn parse_spec<E>(
    raw: &HashMap<String, String>,
    allowed_filter_fields: &[&str],
) -> Option<SearchSpec<E>> {
    let mut spec = SearchSpec::new();

    if raw.contains_key("page") || raw.contains_key("limit") {
        let page = raw.get("page").and_then(|p| parse_int(p)).unwrap_or(1);
        let limit = raw
            .get("limit")
            .and_then(|l| parse_int(l))
            .unwrap_or(DEFAULT_LIMIT as i64);
        spec.pagination = Some(Pagination::new(page, limit));
    }

    if let Some(sort) = raw.get("sort") {
        spec.sort = parse_sort(sort);
    }

    if let Some(query) = raw.get("search").filter(|q| !q.trim().is_empty()) {
        let mut search = TextSearch::new(query.trim());
        if let Some(fields) = raw.get("searchFields") {
            search.fields = split_list(fields);
        }
        if let Some(b) = raw.get("caseSensitive").and_then(|v| parse_bool(v)) {
            search.options.case_sensitive = b;
        }
        if let Some(b) = raw.get("useRegex").and_then(|v| parse_bool(v)) {
            search.options.use_regex = b;
        }
        search.options.fuzzy_tolerance = raw
            .get("fuzzyTolerance")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|f| f.is_finite());
        spec.search = Some(search);
    }

    if raw.contains_key("dateFrom") || raw.contains_key("dateTo") || raw.contains_key("dateField") {
        let field = raw
            .get("dateField")
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_DATE_FIELD);
        let start = raw.get("dateFrom").and_then(|d| parse_timestamp(d));
        let end = raw.get("dateTo").and_then(|d| parse_timestamp(d));
        spec = spec.date_range(field, start, end);
    }

    if let Some(field) = raw.get("numField").map(|f| f.trim()).filter(|f| !f.is_empty()) {
        let min = raw.get("numMin").and_then(|v| parse_float(v));
        let max = raw.get("numMax").and_then(|v| parse_float(v));
        spec = spec.numeric_range(field, min, max);
    }

    if let Some(b) = raw.get("includeDeleted").and_then(|v| parse_bool(v)) {
        spec.advanced.include_deleted = b;
    }
    if let Some(select) = raw.get("select") {
        spec.advanced.select = split_list(select);
    }
    if let Some(populate) = raw.get("populate") {
        spec.advanced.populate = split_list(populate);
    }

    for (key, value) in raw {
        if RESERVED_PARAMS.contains(&key.as_str()) || !allowed_filter_fields.contains(&key.as_str())
        {
            continue;
        }
        spec.filters.insert(key.clone(), coerce_filter_value(value));
        spec.raw_filters.insert(key.clone(), value.clone());
    }

    if spec.is_empty() {
        None
    } else {
        Some(spec)
    }
}

/// Decode an `application/x-www-form-urlencoded` query string and parse it.
///
/// A repeated parameter keeps its last value.
pub fn parse_query<E>(query: &str, allowed_filter_fields: &[&str]) -> Option<SearchSpec<E>> {
    let raw: HashMap<String, String> =
        form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect();
    parse_spec(&raw, allowed_filter_fields)
}

/// Coerce a raw filter value: booleans, `null`, finite numbers, else text.
pub fn coerce_filter_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && looks_numeric(raw) => Value::Float(f),
        _ => Value::Text(raw.to_string()),
    }
}

// f64::from_str also accepts words like "inf" and "nan".
fn looks_numeric(raw: &str) -> bool {
    raw.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

/// `field:direction` pairs separated by commas.
fn parse_sort(raw: &str) -> Vec<SortField> {
    raw.split(',')
        .filter_map(|segment| {
            let mut parts = segment.splitn(2, ':');
            let field = parts.next()?.trim();
            if field.is_empty() {
                return None;
            }
            let order = parts.next().map(SortOrder::parse).unwrap_or(SortOrder::Asc);
            Some(SortField {
                field: field.to_string(),
                order,
            })
        })
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_parameters_yield_no_spec() {
        assert!(parse_spec::<()>(&HashMap::new(), &["name"]).is_none());
    }

    #[test]
    fn only_unrecognised_parameters_yield_no_spec() {
        let raw = params(&[("secretField", "x"), ("sort", ",")]);
        assert!(parse_spec::<()>(&raw, &["name"]).is_none());
    }

    #[test]
    fn filters_outside_the_allow_list_are_dropped() {
        let raw = params(&[("secretField", "x"), ("name", "alpha")]);
        let spec = parse_spec::<()>(&raw, &["name"]).unwrap();
        assert!(!spec.filters.contains_key("secretField"));
        assert_eq!(spec.filters.get("name"), Some(&Value::Text("alpha".into())));
    }

    #[test]
    fn filter_values_are_coerced() {
        let raw = params(&[
            ("completed", "true"),
            ("archived", "false"),
            ("status", "null"),
            ("priority", "3"),
            ("weight", "2.5"),
            ("name", "Infinity"),
        ]);
        let allowed = ["completed", "archived", "status", "priority", "weight", "name"];
        let spec = parse_spec::<()>(&raw, &allowed).unwrap();
        assert_eq!(spec.filters["completed"], Value::Bool(true));
        assert_eq!(spec.filters["archived"], Value::Bool(false));
        assert_eq!(spec.filters["status"], Value::Null);
        assert_eq!(spec.filters["priority"], Value::Integer(3));
        assert_eq!(spec.filters["weight"], Value::Float(2.5));
        assert_eq!(spec.filters["name"], Value::Text("Infinity".into()));
        assert_eq!(spec.raw_filters["priority"], "3");
    }

    #[test]
    fn pagination_defaults_and_clamping() {
        let spec = parse_spec::<()>(&params(&[("page", "2")]), &[]).unwrap();
        assert_eq!(spec.pagination, Some(Pagination::new(2, 10)));

        let spec = parse_spec::<()>(&params(&[("limit", "500")]), &[]).unwrap();
        let p = spec.pagination.unwrap();
        assert_eq!((p.page(), p.limit()), (1, 100));

        let spec = parse_spec::<()>(&params(&[("page", "abc"), ("limit", "-4")]), &[]).unwrap();
        let p = spec.pagination.unwrap();
        assert_eq!((p.page(), p.limit()), (1, 1));
    }

    #[test]
    fn sort_parsing_never_fails() {
        let spec = parse_spec::<()>(&params(&[("sort", "name:desc,createdAt,priority:up,")]), &[])
            .unwrap();
        let sort: Vec<_> = spec
            .sort
            .iter()
            .map(|s| (s.field.as_str(), s.order))
            .collect();
        assert_eq!(
            sort,
            vec![
                ("name", SortOrder::Desc),
                ("createdAt", SortOrder::Asc),
                ("priority", SortOrder::Asc),
            ]
        );
    }

    #[test]
    fn search_parameters() {
        let raw = params(&[
            ("search", "alpha"),
            ("searchFields", "name, description"),
            ("caseSensitive", "YES"),
            ("useRegex", "maybe"),
            ("fuzzyTolerance", "0.3"),
        ]);
        let spec = parse_spec::<()>(&raw, &[]).unwrap();
        let search = spec.search.unwrap();
        assert_eq!(search.query, "alpha");
        assert_eq!(search.fields, vec!["name", "description"]);
        assert!(search.options.case_sensitive);
        assert!(!search.options.use_regex);
        assert_eq!(search.options.fuzzy_tolerance, Some(0.3));
    }

    #[test]
    fn date_range_defaults_to_created_at() {
        let raw = params(&[("dateFrom", "2024-01-01"), ("dateTo", "not a date")]);
        let spec = parse_spec::<()>(&raw, &[]).unwrap();
        let range = &spec.advanced.date_range[0];
        assert_eq!(range.field, "createdAt");
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(range.end, None);
    }

    #[test]
    fn numeric_range_requires_a_field() {
        let spec = parse_spec::<()>(&params(&[("numMin", "1"), ("page", "1")]), &[]).unwrap();
        assert!(spec.advanced.numeric_range.is_empty());

        let raw = params(&[("numField", "priority"), ("numMin", "1"), ("numMax", "x")]);
        let spec = parse_spec::<()>(&raw, &[]).unwrap();
        let range = &spec.advanced.numeric_range[0];
        assert_eq!(range.field, "priority");
        assert_eq!(range.min, Some(1.0));
        assert_eq!(range.max, None);
    }

    #[test]
    fn advanced_lists_and_flags() {
        let raw = params(&[
            ("select", "name,priority"),
            ("populate", "status"),
            ("includeDeleted", "1"),
        ]);
        let spec = parse_spec::<()>(&raw, &[]).unwrap();
        assert_eq!(spec.advanced.select, vec!["name", "priority"]);
        assert_eq!(spec.advanced.populate, vec!["status"]);
        assert!(spec.advanced.include_deleted);
    }

    #[test]
    fn query_strings_are_decoded() {
        let spec = parse_query::<()>("?search=big%20rock&name=Item+01&page=3", &["name"]).unwrap();
        assert_eq!(spec.search.unwrap().query, "big rock");
        assert_eq!(spec.filters["name"], Value::Text("Item 01".into()));
        assert_eq!(spec.pagination.unwrap().page(), 3);
    }
}
