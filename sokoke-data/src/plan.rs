//! Backend-neutral resolution of a [`SearchSpec`] against an entity schema.
//!
//! Both backend compilers consume a [`QueryPlan`], so field validation,
//! value normalisation and sort defaults behave identically everywhere.

use crate::entity::{Entity, Field, FieldKind, Relation};
use crate::error::DataError;
use crate::search::{Pagination, SearchSpec, SortOrder};
use crate::value::Value;

/// Field sorted on when a search does not ask for an order.
pub const DEFAULT_SORT_FIELD: &str = "updatedAt";

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Equality; `Null` matches null or missing values.
    Eq(&'static Field, Value),
    /// Inequality that also matches null or missing values.
    NotEq(&'static Field, Value),
    Gte(&'static Field, Value),
    Lte(&'static Field, Value),
}

impl Predicate {
    pub fn field(&self) -> &'static Field {
        match self {
            Predicate::Eq(f, _)
            | Predicate::NotEq(f, _)
            | Predicate::Gte(f, _)
            | Predicate::Lte(f, _) => f,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub query: String,
    /// `None` when the caller named no fields.
    pub fields: Option<Vec<&'static Field>>,
    pub case_sensitive: bool,
    pub use_regex: bool,
}

/// A validated, normalised search ready for compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// AND-combined.
    pub predicates: Vec<Predicate>,
    pub search: Option<SearchPlan>,
    /// Never empty; always ends on the identifier.
    pub sort: Vec<(&'static Field, SortOrder)>,
    pub pagination: Option<Pagination>,
    /// Fields to project, the identifier included. `None` keeps every field.
    pub select: Option<Vec<&'static Field>>,
    pub populate: Vec<&'static Relation>,
}

impl QueryPlan {
    /// Resolve `spec` for entity `E`.
    ///
    /// # Errors
    ///
    /// Returns `DataError::UnknownField` for any field or relation name the
    /// entity does not declare.
    pub fn resolve<E: Entity>(spec: Option<&SearchSpec<E>>) -> Result<Self, DataError> {
        let mut plan = QueryPlan {
            predicates: Vec::new(),
            search: None,
            sort: Vec::new(),
            pagination: None,
            select: None,
            populate: Vec::new(),
        };
        let include_deleted = spec.map(|s| s.advanced.include_deleted).unwrap_or(false);

        if let Some(spec) = spec {
            for (name, value) in &spec.filters {
                let field = lookup::<E>(name)?;
                let value = match spec.raw_filters.get(name) {
                    Some(raw) if field.is_textual() && !value.is_null() => Value::Text(raw.clone()),
                    _ => value.clone().coerce(field.kind),
                };
                plan.predicates.push(Predicate::Eq(field, value));
            }

            if let Some(search) = spec.search.as_ref().filter(|s| !s.query.is_empty()) {
                let fields = if search.fields.is_empty() {
                    None
                } else {
                    Some(
                        search
                            .fields
                            .iter()
                            .map(|name| lookup::<E>(name))
                            .collect::<Result<Vec<_>, _>>()?,
                    )
                };
                plan.search = Some(SearchPlan {
                    query: search.query.clone(),
                    fields,
                    case_sensitive: search.options.case_sensitive,
                    use_regex: search.options.use_regex,
                });
            }

            for range in &spec.advanced.date_range {
                let field = lookup::<E>(&range.field)?;
                if let Some(start) = range.start {
                    plan.predicates.push(Predicate::Gte(field, Value::Timestamp(start)));
                }
                if let Some(end) = range.end {
                    plan.predicates.push(Predicate::Lte(field, Value::Timestamp(end)));
                }
            }

            for range in &spec.advanced.numeric_range {
                let field = lookup::<E>(&range.field)?;
                if let Some(min) = range.min {
                    plan.predicates.push(Predicate::Gte(field, Value::Float(min)));
                }
                if let Some(max) = range.max {
                    plan.predicates.push(Predicate::Lte(field, Value::Float(max)));
                }
            }

            for sort in &spec.sort {
                plan.sort.push((lookup::<E>(&sort.field)?, sort.order));
            }

            if !spec.advanced.select.is_empty() {
                let mut select = vec![id_field::<E>()?];
                for name in &spec.advanced.select {
                    let field = lookup::<E>(name)?;
                    if !select.iter().any(|f| f.name == field.name) {
                        select.push(field);
                    }
                }
                plan.select = Some(select);
            }

            for name in &spec.advanced.populate {
                let relation =
                    E::relation(name).ok_or_else(|| DataError::unknown_field(E::name(), name))?;
                plan.populate.push(relation);
            }

            plan.pagination = spec.pagination;
        }

        if plan.sort.is_empty() {
            if let Some(field) = E::field(DEFAULT_SORT_FIELD) {
                plan.sort.push((field, SortOrder::Desc));
            }
        }
        if !plan.sort.iter().any(|(f, _)| f.kind == FieldKind::Id) {
            plan.sort.push((id_field::<E>()?, SortOrder::Asc));
        }

        if !include_deleted {
            if let Some(name) = E::archived_field() {
                plan.predicates
                    .push(Predicate::NotEq(lookup::<E>(name)?, Value::Bool(true)));
            }
        }

        Ok(plan)
    }

    /// Fields searched when the caller named none.
    pub fn default_search_fields<E: Entity>() -> Vec<&'static Field> {
        E::fields().iter().filter(|f| f.is_text()).collect()
    }

    /// `true` when `field` is part of the projection.
    pub fn selects(&self, field: &Field) -> bool {
        match &self.select {
            None => true,
            Some(select) => select.iter().any(|f| f.name == field.name),
        }
    }

    pub fn populates(&self, relation: &str) -> bool {
        self.populate.iter().any(|r| r.name == relation)
    }
}

fn lookup<E: Entity>(name: &str) -> Result<&'static Field, DataError> {
    E::field(name).ok_or_else(|| DataError::unknown_field(E::name(), name))
}

fn id_field<E: Entity>() -> Result<&'static Field, DataError> {
    E::fields()
        .iter()
        .find(|f| f.kind == FieldKind::Id)
        .ok_or_else(|| DataError::unknown_field(E::name(), "id"))
}
