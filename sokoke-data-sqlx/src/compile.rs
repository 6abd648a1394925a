//! Compilation of a [`QueryPlan`] into parameterised SQL.
//!
//! One compiler serves every dialect; only placeholders, identifier quoting
//! and the text-matching operators differ.

use sokoke_data::query::{Condition, Dialect, QueryBuilder};
use sokoke_data::{
    DataError, Entity, Field, FieldKind, Predicate, QueryPlan, Relation, SortOrder, Value,
};

/// Count and fetch statements sharing one filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSearch {
    pub count: (String, Vec<Value>),
    pub fetch: (String, Vec<Value>),
}

/// Compile a resolved search for entity `E`.
pub fn compile_search<E: Entity>(plan: &QueryPlan, dialect: Dialect) -> Result<CompiledSearch, DataError> {
    let mut query = joined_select::<E>(dialect, |field| plan.selects(field))?;

    for predicate in &plan.predicates {
        query = query.where_condition(condition::<E>(predicate));
    }

    if let Some(search) = &plan.search {
        let fields = match &search.fields {
            Some(fields) => fields.clone(),
            None => QueryPlan::default_search_fields::<E>(),
        };
        let group = fields
            .into_iter()
            .filter(|f| f.is_textual())
            .map(|f| {
                let column = qualified::<E>(f);
                if search.use_regex {
                    Condition::Regex {
                        column,
                        pattern: search.query.clone(),
                        case_sensitive: search.case_sensitive,
                    }
                } else {
                    Condition::Contains {
                        column,
                        needle: search.query.clone(),
                        case_sensitive: search.case_sensitive,
                    }
                }
            })
            .collect();
        query = query.where_any(group);
    }

    let count = query.build_count()?;

    for (field, order) in &plan.sort {
        query = query.order_by(&qualified::<E>(field), *order == SortOrder::Asc);
    }
    if let Some(page) = plan.pagination {
        query = query.limit(page.limit()).offset(page.offset());
    }
    let fetch = query.build_select()?;

    Ok(CompiledSearch { count, fetch })
}

/// `SELECT` of the entity's columns plus every to-one relation, left-joined.
///
/// Relation columns come back aliased `<relation>__<column>`; they are only
/// selected when the owning reference field is.
pub fn joined_select<E: Entity>(
    dialect: Dialect,
    selects: impl Fn(&Field) -> bool,
) -> Result<QueryBuilder, DataError> {
    let table = E::table_name();
    let mut query = QueryBuilder::new_with_dialect(table, dialect);

    for field in E::fields().iter().filter(|f| selects(f)) {
        query = select_field(query, &qualified::<E>(field), field, field.column);
    }

    for relation in E::relations().iter().filter(|r| !r.is_to_many()) {
        let owner = E::field(relation.name)
            .filter(|f| f.kind == FieldKind::Reference)
            .ok_or_else(|| DataError::unknown_field(E::name(), relation.name))?;
        let related_id = relation
            .fields
            .iter()
            .find(|f| f.kind == FieldKind::Id)
            .ok_or_else(|| DataError::unknown_field(E::name(), relation.name))?;

        query = query.left_join(
            relation.table,
            relation.name,
            &format!("{table}.{}", owner.column),
            &format!("{}.{}", relation.name, related_id.column),
        );
        if selects(owner) {
            for field in relation.fields {
                query = select_field(
                    query,
                    &format!("{}.{}", relation.name, field.column),
                    field,
                    &format!("{}__{}", relation.name, field.column),
                );
            }
        }
    }
    Ok(query)
}

/// `SELECT` of the children of `owner_ids` through the to-many `relation`,
/// ordered by the child identifier.
pub fn children_select(
    relation: &Relation,
    dialect: Dialect,
    owner_ids: Vec<Value>,
) -> Result<QueryBuilder, DataError> {
    let foreign_key = relation
        .foreign_key()
        .ok_or_else(|| DataError::unknown_field(relation.name, "foreign key"))?;
    let id = relation
        .id_field()
        .ok_or_else(|| DataError::unknown_field(relation.name, "id"))?;

    let mut query = QueryBuilder::new_with_dialect(relation.table, dialect);
    for field in relation.fields {
        query = select_field(
            query,
            &format!("{}.{}", relation.table, field.column),
            field,
            field.column,
        );
    }
    Ok(query
        .where_in(&format!("{}.{}", relation.table, foreign_key.column), owner_ids)
        .order_by(&format!("{}.{}", relation.table, id.column), true))
}

fn select_field(query: QueryBuilder, column: &str, field: &Field, alias: &str) -> QueryBuilder {
    match field.kind {
        FieldKind::Boolean => query.select_bool_as(column, alias),
        _ => query.select_as(column, alias),
    }
}

pub(crate) fn qualified<E: Entity>(field: &Field) -> String {
    format!("{}.{}", E::table_name(), field.column)
}

fn condition<E: Entity>(predicate: &Predicate) -> Condition {
    match predicate {
        Predicate::Eq(f, v) => Condition::Eq(qualified::<E>(f), v.clone()),
        Predicate::NotEq(f, v) => Condition::NotEqOrNull(qualified::<E>(f), v.clone()),
        Predicate::Gte(f, v) => Condition::Gte(qualified::<E>(f), v.clone()),
        Predicate::Lte(f, v) => Condition::Lte(qualified::<E>(f), v.clone()),
    }
}
