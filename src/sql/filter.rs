//! Predicates, sort keys and aggregates over catalog columns.

use crate::error::QueryError;
use crate::schema::{quoted, Catalog, ColumnDef, EntityDef};
use crate::sql::QueryBuf;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// Filter predicate over the columns of one entity.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Compare(String, CompareOp, Value),
    /// Inclusive on both ends.
    Between(String, Value, Value),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Compare(column.to_string(), CompareOp::Eq, value.into())
    }

    pub fn between(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Filter::Between(column.to_string(), low.into(), high.into())
    }

    /// Render as SQL with `alias` qualifying every column; values are pushed as parameters.
    pub(crate) fn render(
        &self,
        catalog: &Catalog,
        entity: &EntityDef,
        alias: &str,
        q: &mut QueryBuf,
    ) -> Result<String, QueryError> {
        Ok(match self {
            Filter::Compare(col, op, v) => {
                let c = column(entity, col)?;
                let ph = q.placeholder(catalog, c, v.clone());
                format!("{}.{} {} {}", alias, quoted(c.name), op.sql(), ph)
            }
            Filter::Between(col, low, high) => {
                let c = column(entity, col)?;
                let lo = q.placeholder(catalog, c, low.clone());
                let hi = q.placeholder(catalog, c, high.clone());
                format!("{}.{} BETWEEN {} AND {}", alias, quoted(c.name), lo, hi)
            }
            Filter::And(parts) | Filter::Or(parts) => {
                let (joiner, empty) = match self {
                    Filter::And(_) => (" AND ", "TRUE"),
                    _ => (" OR ", "FALSE"),
                };
                if parts.is_empty() {
                    return Ok(empty.to_string());
                }
                let rendered = parts
                    .iter()
                    .map(|p| p.render(catalog, entity, alias, q))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("({})", rendered.join(joiner))
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        OrderBy {
            column: column.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: &str) -> Self {
        OrderBy {
            column: column.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Aggregate {
    /// `count(*)`.
    CountAll,
    Count(String),
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

impl Aggregate {
    /// SQL expression and the type a HAVING operand is cast to.
    pub(crate) fn render(
        &self,
        catalog: &Catalog,
        entity: &EntityDef,
        alias: &str,
    ) -> Result<(String, String), QueryError> {
        Ok(match self {
            Aggregate::CountAll => ("count(*)".into(), "int8".into()),
            Aggregate::Count(col) => {
                let c = column(entity, col)?;
                (format!("count({}.{})", alias, quoted(c.name)), "int8".into())
            }
            // sum/avg of integers is numeric, which the row decoder does not read; widen to float8.
            Aggregate::Sum(col) | Aggregate::Avg(col) => {
                let c = column(entity, col)?;
                let func = if matches!(self, Aggregate::Sum(_)) { "sum" } else { "avg" };
                (format!("{}({}.{})::float8", func, alias, quoted(c.name)), "float8".into())
            }
            Aggregate::Min(col) | Aggregate::Max(col) => {
                let c = column(entity, col)?;
                let func = if matches!(self, Aggregate::Min(_)) { "min" } else { "max" };
                (format!("{}({}.{})", func, alias, quoted(c.name)), c.ty.cast(&catalog.namespace))
            }
        })
    }
}

pub(crate) fn column<'a>(entity: &'a EntityDef, name: &str) -> Result<&'a ColumnDef, QueryError> {
    entity.column(name).ok_or_else(|| QueryError::UnknownColumn {
        entity: entity.name.to_string(),
        column: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{app_catalog, USER};
    use crate::sql::PgBindValue;
    use serde_json::json;

    #[test]
    fn between_binds_both_bounds_with_cast() {
        let catalog = app_catalog("public");
        let user = catalog.entity(USER).unwrap();
        let mut q = QueryBuf::new();
        let sql = Filter::between("age", 20, 25).render(&catalog, user, "t0", &mut q).unwrap();
        assert_eq!(sql, r#"t0."age" BETWEEN $1::integer AND $2::integer"#);
        assert_eq!(q.params, vec![PgBindValue::I64(20), PgBindValue::I64(25)]);
    }

    #[test]
    fn nested_boolean_filters_are_parenthesized() {
        let catalog = app_catalog("public");
        let user = catalog.entity(USER).unwrap();
        let mut q = QueryBuf::new();
        let f = Filter::Or(vec![
            Filter::eq("role", "ADMIN"),
            Filter::And(vec![
                Filter::Compare("age".into(), CompareOp::Gte, json!(18)),
                Filter::Compare("name".into(), CompareOp::Ne, json!("root")),
            ]),
        ]);
        let sql = f.render(&catalog, user, "t0", &mut q).unwrap();
        assert_eq!(
            sql,
            r#"(t0."role" = $1::"public"."user_role" OR (t0."age" >= $2::integer AND t0."name" <> $3::varchar))"#
        );
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let catalog = app_catalog("public");
        let user = catalog.entity(USER).unwrap();
        let err = Filter::eq("nickname", "x")
            .render(&catalog, user, "t0", &mut QueryBuf::new())
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownColumn {
                entity: "user".into(),
                column: "nickname".into()
            }
        );
    }

    #[test]
    fn aggregates_render_with_operand_type() {
        let catalog = app_catalog("public");
        let user = catalog.entity(USER).unwrap();
        assert_eq!(
            Aggregate::Count("id".into()).render(&catalog, user, "t0").unwrap(),
            (r#"count(t0."id")"#.to_string(), "int8".to_string())
        );
        assert_eq!(
            Aggregate::Avg("age".into()).render(&catalog, user, "t0").unwrap(),
            (r#"avg(t0."age")::float8"#.to_string(), "float8".to_string())
        );
        assert_eq!(
            Aggregate::Max("age".into()).render(&catalog, user, "t0").unwrap().1,
            "integer"
        );
    }
}
