use crate::value::Value;

/// A fluent builder for parameterised SQL statements.
///
/// Every identifier is validated and quoted for the dialect; every value is
/// returned as a bind parameter, never interpolated.
///
/// # Example
///
/// ```ignore
/// let (sql, params) = QueryBuilder::new_with_dialect("features", Dialect::Postgres)
///     .left_join("statuses", "status", "features.status_id", "status.id")
///     .select_as("features.name", "name")
///     .where_eq("features.completed", false)
///     .order_by("features.name", true)
///     .limit(10)
///     .build_select()?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite: `?` placeholders, double-quote identifiers.
    Sqlite,
    /// MySQL: `?` placeholders, backtick identifiers.
    MySql,
    /// Postgres: `$1, $2, ...` placeholders, double-quote identifiers.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    // MySQL already treats backslash as the LIKE escape, and a lone '\'
    // inside a MySQL string literal would escape the closing quote.
    fn like_escape(self) -> &'static str {
        match self {
            Dialect::MySql => "",
            Dialect::Sqlite | Dialect::Postgres => " ESCAPE '\\'",
        }
    }

    /// Order nulls like the document store does: lowest.
    fn nulls(self, ascending: bool) -> &'static str {
        match (self, ascending) {
            (Dialect::Postgres, true) => " NULLS FIRST",
            (Dialect::Postgres, false) => " NULLS LAST",
            _ => "",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }
}

/// A `WHERE` predicate. Top-level conditions are AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `col = ?`, or `col IS NULL` for a null value.
    Eq(String, Value),
    /// `(col IS NULL OR col <> ?)`.
    NotEqOrNull(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    IsNull(String),
    /// `col IN (?, ..)`; an empty list matches nothing.
    In(String, Vec<Value>),
    /// Substring match.
    Contains {
        column: String,
        needle: String,
        case_sensitive: bool,
    },
    /// Regular expression match; not available on SQLite.
    Regex {
        column: String,
        pattern: String,
        case_sensitive: bool,
    },
    /// OR of the inner conditions; an empty group matches nothing.
    Any(Vec<Condition>),
}

#[derive(Debug, Clone)]
struct Join {
    table: String,
    alias: String,
    left: String,
    right: String,
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    alias: Option<String>,
    integer: bool,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    joins: Vec<Join>,
    columns: Vec<Column>,
    conditions: Vec<Condition>,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            joins: Vec::new(),
            columns: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Sqlite,
        }
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholders, quoting and operators).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// `LEFT JOIN table AS alias ON left = right`.
    pub fn left_join(mut self, table: &str, alias: &str, left: &str, right: &str) -> Self {
        self.joins.push(Join {
            table: table.to_string(),
            alias: alias.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        });
        self
    }

    pub fn select(mut self, column: &str) -> Self {
        self.columns.push(Column {
            name: column.to_string(),
            alias: None,
            integer: false,
        });
        self
    }

    pub fn select_as(mut self, column: &str, alias: &str) -> Self {
        self.columns.push(Column {
            name: column.to_string(),
            alias: Some(alias.to_string()),
            integer: false,
        });
        self
    }

    /// Like [`select_as`](Self::select_as) for a boolean column. SQLite reads
    /// it through `CAST(.. AS INTEGER)`, so it always decodes as an integer.
    pub fn select_bool_as(mut self, column: &str, alias: &str) -> Self {
        self.columns.push(Column {
            name: column.to_string(),
            alias: Some(alias.to_string()),
            integer: self.dialect == Dialect::Sqlite,
        });
        self
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    pub fn where_not_eq_or_null(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::NotEqOrNull(column.to_string(), value.into()));
        self
    }

    pub fn where_gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Gte(column.to_string(), value.into()));
        self
    }

    pub fn where_lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Lte(column.to_string(), value.into()));
        self
    }

    pub fn where_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::In(column.to_string(), values));
        self
    }

    pub fn where_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn where_contains(mut self, column: &str, needle: &str, case_sensitive: bool) -> Self {
        self.conditions.push(Condition::Contains {
            column: column.to_string(),
            needle: needle.to_string(),
            case_sensitive,
        });
        self
    }

    pub fn where_any(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions.push(Condition::Any(conditions));
        self
    }

    pub fn where_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    /// Build a SELECT query returning `(sql, bind_values)`.
    ///
    /// Without any `select` call every column is returned.
    pub fn build_select(&self) -> Result<(String, Vec<Value>), QueryError> {
        let columns = self.format_column_list()?;
        let mut sql = format!("SELECT {columns} FROM {}", self.format_from()?);
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        self.append_order(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok((sql, params))
    }

    /// Build a COUNT query over the same joins and conditions.
    pub fn build_count(&self) -> Result<(String, Vec<Value>), QueryError> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.format_from()?);
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    pub fn build_insert(&self, values: &[(&str, Value)]) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_identifier(&self.table, "table")?;
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len());
        for (column, value) in values {
            columns.push(self.format_identifier(column, "column")?);
            params.push(value.clone());
            placeholders.push(self.dialect.placeholder(params.len()));
        }
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, params))
    }

    /// `UPDATE table SET ... WHERE <conditions>`.
    pub fn build_update(&self, values: &[(&str, Value)]) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_identifier(&self.table, "table")?;
        let mut params = Vec::with_capacity(values.len());
        let mut sets = Vec::with_capacity(values.len());
        for (column, value) in values {
            let column = self.format_identifier(column, "column")?;
            params.push(value.clone());
            sets.push(format!("{column} = {}", self.dialect.placeholder(params.len())));
        }
        let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
        self.append_where(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    pub fn build_delete(&self) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_identifier(&self.table, "table")?;
        let mut sql = format!("DELETE FROM {table}");
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    fn format_from(&self) -> Result<String, QueryError> {
        let mut from = self.format_identifier(&self.table, "table")?;
        for join in &self.joins {
            from.push_str(&format!(
                " LEFT JOIN {} AS {} ON {} = {}",
                self.format_identifier(&join.table, "table")?,
                self.format_identifier(&join.alias, "alias")?,
                self.format_identifier(&join.left, "column")?,
                self.format_identifier(&join.right, "column")?,
            ));
        }
        Ok(from)
    }

    fn append_where(&self, sql: &mut String, params: &mut Vec<Value>) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for cond in &self.conditions {
            clauses.push(self.render_condition(cond, params)?);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        Ok(())
    }

    fn bind(&self, params: &mut Vec<Value>, value: Value) -> String {
        params.push(value);
        self.dialect.placeholder(params.len())
    }

    fn render_condition(
        &self,
        cond: &Condition,
        params: &mut Vec<Value>,
    ) -> Result<String, QueryError> {
        let clause = match cond {
            Condition::Eq(col, Value::Null) | Condition::IsNull(col) => {
                format!("{} IS NULL", self.format_identifier(col, "column")?)
            }
            Condition::Eq(col, val) => {
                let col = self.format_identifier(col, "column")?;
                format!("{col} = {}", self.bind(params, val.clone()))
            }
            Condition::NotEqOrNull(col, val) => {
                let col = self.format_identifier(col, "column")?;
                format!("({col} IS NULL OR {col} <> {})", self.bind(params, val.clone()))
            }
            Condition::Gte(col, val) => {
                let col = self.format_identifier(col, "column")?;
                format!("{col} >= {}", self.bind(params, val.clone()))
            }
            Condition::Lte(col, val) => {
                let col = self.format_identifier(col, "column")?;
                format!("{col} <= {}", self.bind(params, val.clone()))
            }
            Condition::In(_, values) if values.is_empty() => "1 = 0".to_string(),
            Condition::In(col, values) => {
                let col = self.format_identifier(col, "column")?;
                let placeholders: Vec<String> =
                    values.iter().map(|v| self.bind(params, v.clone())).collect();
                format!("{col} IN ({})", placeholders.join(", "))
            }
            Condition::Contains {
                column,
                needle,
                case_sensitive,
            } => {
                let col = self.format_identifier(column, "column")?;
                if *case_sensitive {
                    let p = self.bind(params, Value::Text(needle.clone()));
                    match self.dialect {
                        Dialect::Sqlite => format!("INSTR({col}, {p}) > 0"),
                        Dialect::Postgres => format!("STRPOS({col}, {p}) > 0"),
                        Dialect::MySql => format!("LOCATE(BINARY {p}, {col}) > 0"),
                    }
                } else if self.dialect == Dialect::Sqlite {
                    // SQLite's LOWER folds ASCII only.
                    let pattern = format!("*{}*", caseless_glob(needle));
                    let p = self.bind(params, Value::Text(pattern));
                    format!("{col} GLOB {p}")
                } else {
                    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
                    let p = self.bind(params, Value::Text(pattern));
                    format!("LOWER({col}) LIKE {p}{}", self.dialect.like_escape())
                }
            }
            Condition::Regex {
                column,
                pattern,
                case_sensitive,
            } => {
                let col = self.format_identifier(column, "column")?;
                let p = match self.dialect {
                    Dialect::Sqlite => {
                        return Err(QueryError::Unsupported(
                            "regular expression search is not available on sqlite",
                        ))
                    }
                    _ => self.bind(params, Value::Text(pattern.clone())),
                };
                match (self.dialect, case_sensitive) {
                    (Dialect::Postgres, true) => format!("{col} ~ {p}"),
                    (Dialect::Postgres, false) => format!("{col} ~* {p}"),
                    (_, true) => format!("REGEXP_LIKE({col}, {p}, 'c')"),
                    (_, false) => format!("REGEXP_LIKE({col}, {p}, 'i')"),
                }
            }
            Condition::Any(inner) if inner.is_empty() => "1 = 0".to_string(),
            Condition::Any(inner) => {
                let mut parts = Vec::with_capacity(inner.len());
                for c in inner {
                    parts.push(self.render_condition(c, params)?);
                }
                format!("({})", parts.join(" OR "))
            }
        };
        Ok(clause)
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, asc) in &self.order {
            let col = self.format_identifier(col, "column")?;
            let dir = if *asc { "ASC" } else { "DESC" };
            clauses.push(format!("{col} {dir}{}", self.dialect.nulls(*asc)));
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        if let Some(limit) = self.limit_val {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset_val {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn format_column_list(&self) -> Result<String, QueryError> {
        if self.columns.is_empty() {
            return Ok("*".to_string());
        }
        let mut out = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let mut col = self.format_identifier(&column.name, "column")?;
            if column.integer {
                col = format!("CAST({col} AS INTEGER)");
            }
            match &column.alias {
                Some(alias) => {
                    out.push(format!("{col} AS {}", self.format_identifier(alias, "alias")?))
                }
                None => out.push(col),
            }
        }
        Ok(out.join(", "))
    }

    fn format_identifier(&self, ident: &str, kind: &'static str) -> Result<String, QueryError> {
        if !is_valid_identifier(ident) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        Ok(quote_identifier(ident, self.dialect))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    Unsupported(&'static str),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::Unsupported(what) => write!(f, "Unsupported query: {what}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<QueryError> for crate::DataError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Unsupported(what) => crate::DataError::Unsupported(what.to_string()),
            other => crate::DataError::Other(other.to_string()),
        }
    }
}

/// Escape `%`, `_` and the escape character itself for a `LIKE` pattern.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A `GLOB` body matching `raw` with Unicode simple case folding: each
/// cased letter becomes a class of its single-character case variants, and
/// the glob metacharacters `*`, `?` and `[` are bracketed.
pub fn caseless_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 4);
    for c in raw.chars() {
        let mut variants = vec![c];
        for variant in [single(c.to_lowercase()), single(c.to_uppercase())]
            .into_iter()
            .flatten()
        {
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
        if variants.len() > 1 {
            out.push('[');
            out.extend(variants);
            out.push(']');
        } else if matches!(c, '*' | '?' | '[') {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}

fn is_valid_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect) -> String {
    let quote = dialect.quote_char();
    ident
        .split('.')
        .map(|part| format!("{quote}{part}{quote}"))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let (sql, params) = QueryBuilder::new("features").build_select().unwrap();
        assert_eq!(sql, "SELECT * FROM \"features\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_eq_and_null() {
        let (sql, params) = QueryBuilder::new("features")
            .where_eq("name", "Login")
            .where_eq("status_id", Value::Null)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"features\" WHERE \"name\" = ? AND \"status_id\" IS NULL"
        );
        assert_eq!(params, vec![Value::Text("Login".into())]);
    }

    #[test]
    fn test_joined_paginated_select() {
        let (sql, params) = QueryBuilder::new("features")
            .left_join("statuses", "status", "features.status_id", "status.id")
            .select_as("features.id", "id")
            .select_as("status.name", "status__name")
            .where_eq("features.completed", false)
            .where_not_eq_or_null("features.archived", true)
            .order_by("features.name", true)
            .order_by("features.id", true)
            .limit(10)
            .offset(10)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"features\".\"id\" AS \"id\", \"status\".\"name\" AS \"status__name\" \
             FROM \"features\" LEFT JOIN \"statuses\" AS \"status\" ON \"features\".\"status_id\" = \"status\".\"id\" \
             WHERE \"features\".\"completed\" = ? \
             AND (\"features\".\"archived\" IS NULL OR \"features\".\"archived\" <> ?) \
             ORDER BY \"features\".\"name\" ASC, \"features\".\"id\" ASC LIMIT 10 OFFSET 10"
        );
        assert_eq!(params, vec![Value::Bool(false), Value::Bool(true)]);
    }

    #[test]
    fn test_count_query() {
        let (sql, params) = QueryBuilder::new("features")
            .where_gte("priority", 2i64)
            .limit(5)
            .build_count()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM \"features\" WHERE \"priority\" >= ?");
        assert_eq!(params, vec![Value::Integer(2)]);
    }

    #[test]
    fn test_postgres_placeholders_and_null_ordering() {
        let (sql, params) = QueryBuilder::new_with_dialect("features", Dialect::Postgres)
            .where_eq("name", "a")
            .where_any(vec![
                Condition::Contains {
                    column: "name".into(),
                    needle: "Lo".into(),
                    case_sensitive: true,
                },
                Condition::Regex {
                    column: "description".into(),
                    pattern: "^lo".into(),
                    case_sensitive: false,
                },
            ])
            .order_by("updated_at", false)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"features\" WHERE \"name\" = $1 \
             AND (STRPOS(\"name\", $2) > 0 OR \"description\" ~* $3) \
             ORDER BY \"updated_at\" DESC NULLS LAST"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_case_insensitive_contains_escapes_wildcards() {
        let (sql, params) = QueryBuilder::new_with_dialect("features", Dialect::Postgres)
            .where_contains("name", "50%_Off", false)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"features\" WHERE LOWER(\"name\") LIKE $1 ESCAPE '\\'"
        );
        assert_eq!(params, vec![Value::Text("%50\\%\\_off%".into())]);
    }

    #[test]
    fn test_sqlite_case_insensitive_contains_folds_unicode() {
        let (sql, params) = QueryBuilder::new("features")
            .where_contains("name", "École*", false)
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM \"features\" WHERE \"name\" GLOB ?");
        assert_eq!(params, vec![Value::Text("*[Éé][cC][oO][lL][eE][*]*".into())]);
    }

    #[test]
    fn test_caseless_glob_leaves_uncased_characters_alone() {
        assert_eq!(caseless_glob("50% off?"), "50% [oO][fF][fF] [?]");
        assert_eq!(caseless_glob("a]["), "[aA]][[]");
        // 'ß' upper-cases to "SS", which has no single-character form.
        assert_eq!(caseless_glob("ß"), "ß");
    }

    #[test]
    fn test_sqlite_booleans_are_read_as_integers() {
        let (sql, _) = QueryBuilder::new("features")
            .select_bool_as("features.completed", "completed")
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT CAST(\"features\".\"completed\" AS INTEGER) AS \"completed\" FROM \"features\""
        );

        let (sql, _) = QueryBuilder::new_with_dialect("features", Dialect::Postgres)
            .select_bool_as("features.completed", "completed")
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"features\".\"completed\" AS \"completed\" FROM \"features\""
        );
    }

    #[test]
    fn test_mysql_quoting_and_binary_locate() {
        let (sql, _) = QueryBuilder::new_with_dialect("features", Dialect::MySql)
            .where_contains("name", "Lo", true)
            .where_contains("description", "lo", false)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `features` WHERE LOCATE(BINARY ?, `name`) > 0 AND LOWER(`description`) LIKE ?"
        );
    }

    #[test]
    fn test_regex_unsupported_on_sqlite() {
        let err = QueryBuilder::new("features")
            .where_condition(Condition::Regex {
                column: "name".into(),
                pattern: ".*".into(),
                case_sensitive: true,
            })
            .build_select()
            .unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }

    #[test]
    fn test_where_in() {
        let (sql, params) = QueryBuilder::new_with_dialect("tasks", Dialect::Postgres)
            .where_in("feature_id", vec!["a".into(), "b".into()])
            .where_eq("completed", false)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"tasks\" WHERE \"feature_id\" IN ($1, $2) AND \"completed\" = $3"
        );
        assert_eq!(params.len(), 3);

        let (sql, params) = QueryBuilder::new("tasks")
            .where_in("feature_id", Vec::new())
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM \"tasks\" WHERE 1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_empty_or_group_matches_nothing() {
        let (sql, _) = QueryBuilder::new("features")
            .where_any(Vec::new())
            .build_count()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM \"features\" WHERE 1 = 0");
    }

    #[test]
    fn test_insert_update_delete() {
        let values = [("id", Value::from("f1")), ("name", Value::from("Login"))];
        let (sql, params) = QueryBuilder::new_with_dialect("features", Dialect::Postgres)
            .build_insert(&values)
            .unwrap();
        assert_eq!(sql, "INSERT INTO \"features\" (\"id\", \"name\") VALUES ($1, $2)");
        assert_eq!(params.len(), 2);

        let (sql, params) = QueryBuilder::new_with_dialect("features", Dialect::Postgres)
            .where_eq("id", "f1")
            .build_update(&[("name", Value::from("Logout"))])
            .unwrap();
        assert_eq!(sql, "UPDATE \"features\" SET \"name\" = $1 WHERE \"id\" = $2");
        assert_eq!(params, vec![Value::from("Logout"), Value::from("f1")]);

        let (sql, _) = QueryBuilder::new_with_dialect("features", Dialect::MySql)
            .where_eq("id", "f1")
            .build_delete()
            .unwrap();
        assert_eq!(sql, "DELETE FROM `features` WHERE `id` = ?");
    }

    #[test]
    fn test_invalid_identifier() {
        let err = QueryBuilder::new("features;drop").build_select().unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { .. }));

        let err = QueryBuilder::new("features")
            .where_eq("name = name OR 1", 1i64)
            .build_count()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { kind: "column", .. }));
    }
}
