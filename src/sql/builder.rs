//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from the catalog.

use crate::error::QueryError;
use crate::relation::{column_expr, resolve, Selection};
use crate::schema::{quoted, Catalog, ColumnDef, EntityDef};
use crate::sql::filter::{column, Aggregate, CompareOp, Filter, OrderBy};
use crate::sql::params::PgBindValue;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Upper bound on any LIMIT the builder emits.
pub const MAX_LIMIT: u32 = 1000;

/// Alias of the root table in every statement.
const ROOT: &str = "t0";

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    pub(crate) fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push `v` bound for the column's type and return its placeholder cast to that type.
    pub(crate) fn placeholder(&mut self, catalog: &Catalog, c: &ColumnDef, v: Value) -> String {
        let n = self.push_param(PgBindValue::for_column(&c.ty, &v));
        format!("${}::{}", n, c.ty.cast(&catalog.namespace))
    }
}

/// Filtered, sorted, paginated read of an entity with optional nested relations.
#[derive(Clone, Debug)]
pub struct ReadQuery {
    pub entity: String,
    pub selection: Selection,
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ReadQuery {
    pub fn new(entity: &str) -> Self {
        ReadQuery {
            entity: entity.to_string(),
            selection: Selection::all(),
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, key: OrderBy) -> Self {
        self.order_by.push(key);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Left,
    Inner,
}

/// Flat SQL-style join of an entity with one of its direct relations.
#[derive(Clone, Debug)]
pub struct JoinedRead {
    pub entity: String,
    pub columns: Vec<String>,
    pub relation: String,
    pub joined_columns: Vec<String>,
    pub kind: JoinKind,
    pub filter: Option<Filter>,
}

/// Grouped aggregate read with an optional HAVING comparison on the aggregate.
#[derive(Clone, Debug)]
pub struct GroupedRead {
    pub entity: String,
    pub group_by: Vec<String>,
    pub aggregate: Aggregate,
    /// Output name of the aggregate.
    pub alias: String,
    pub having: Option<(CompareOp, Value)>,
    pub filter: Option<Filter>,
}

fn entity<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a EntityDef, QueryError> {
    catalog
        .entity(name)
        .ok_or_else(|| QueryError::UnknownEntity(name.to_string()))
}

fn single_pk(entity: &EntityDef) -> Result<&ColumnDef, QueryError> {
    entity
        .single_pk()
        .ok_or_else(|| QueryError::CompositeKey(entity.name.to_string()))
}

/// Columns of `entity` by name, or all of them when `names` is None.
fn projection<'a>(entity: &'a EntityDef, names: Option<&[&str]>) -> Result<Vec<&'a ColumnDef>, QueryError> {
    match names {
        None => Ok(entity.columns.iter().collect()),
        Some(names) => names.iter().map(|n| column(entity, n)).collect(),
    }
}

fn projection_list(alias: &str, cols: &[&ColumnDef]) -> String {
    cols.iter().map(|c| column_expr(alias, c)).collect::<Vec<_>>().join(", ")
}

fn where_clause(catalog: &Catalog, entity: &EntityDef, filter: Option<&Filter>, q: &mut QueryBuf) -> Result<String, QueryError> {
    Ok(match filter {
        Some(f) => format!(" WHERE {}", f.render(catalog, entity, ROOT, q)?),
        None => String::new(),
    })
}

/// ORDER BY the requested keys, then any primary-key column not already listed so ties
/// come back in a stable order.
fn order_clause(entity: &EntityDef, keys: &[OrderBy]) -> Result<String, QueryError> {
    let mut parts = Vec::new();
    let mut listed = HashSet::new();
    for k in keys {
        let c = column(entity, &k.column)?;
        listed.insert(c.name);
        parts.push(format!("{}.{} {}", ROOT, quoted(c.name), k.direction.sql()));
    }
    for pk in &entity.primary_key {
        if listed.insert(*pk) {
            parts.push(format!("{}.{} ASC", ROOT, quoted(pk)));
        }
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

/// SELECT with the selection tree rendered as nested JSON subqueries.
pub fn select_tree(catalog: &Catalog, query: &ReadQuery) -> Result<QueryBuf, QueryError> {
    let plan = resolve(catalog, &query.entity, &query.selection)?;
    let mut q = QueryBuf::new();
    let where_clause = where_clause(catalog, plan.entity, query.filter.as_ref(), &mut q)?;
    let order_clause = order_clause(plan.entity, &query.order_by)?;
    let limit_clause = query
        .limit
        .map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT)))
        .unwrap_or_default();
    let offset_clause = query.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}{}",
        plan.select_list(catalog).join(", "),
        catalog.table(plan.entity),
        plan.alias,
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    Ok(q)
}

/// SELECT root columns and related columns over a single JOIN.
pub fn select_joined(catalog: &Catalog, query: &JoinedRead) -> Result<QueryBuf, QueryError> {
    let root = entity(catalog, &query.entity)?;
    let rel = catalog
        .relation(root.name, &query.relation)
        .ok_or_else(|| QueryError::UnknownRelation {
            entity: root.name.to_string(),
            relation: query.relation.clone(),
        })?;
    if rel.through.is_some() {
        return Err(QueryError::UnsupportedJoin(rel.name.to_string()));
    }
    let target = entity(catalog, rel.target)?;
    const JOINED: &str = "t1";

    let mut outputs = HashSet::new();
    let mut select_parts = Vec::new();
    for (alias, ent, names) in [(ROOT, root, &query.columns), (JOINED, target, &query.joined_columns)] {
        for name in names {
            let c = column(ent, name)?;
            if !outputs.insert(c.name) {
                return Err(QueryError::DuplicateOutput(c.name.to_string()));
            }
            select_parts.push(column_expr(alias, c));
        }
    }

    let mut q = QueryBuf::new();
    let where_clause = where_clause(catalog, root, query.filter.as_ref(), &mut q)?;
    let join = match query.kind {
        JoinKind::Left => "LEFT JOIN",
        JoinKind::Inner => "JOIN",
    };
    q.sql = format!(
        "SELECT {} FROM {} {} {} {} {} ON {}.{} = {}.{}{}{}",
        select_parts.join(", "),
        catalog.table(root),
        ROOT,
        join,
        catalog.table(target),
        JOINED,
        JOINED,
        quoted(rel.target_column),
        ROOT,
        quoted(rel.source_column),
        where_clause,
        order_clause(root, &[])?
    );
    Ok(q)
}

/// SELECT group columns and one aggregate, GROUP BY / HAVING, ordered by the group columns.
pub fn select_grouped(catalog: &Catalog, query: &GroupedRead) -> Result<QueryBuf, QueryError> {
    let ent = entity(catalog, &query.entity)?;
    let group_cols = query
        .group_by
        .iter()
        .map(|n| column(ent, n))
        .collect::<Result<Vec<_>, _>>()?;
    if group_cols.iter().any(|c| c.name == query.alias) {
        return Err(QueryError::DuplicateOutput(query.alias.clone()));
    }
    let (agg_expr, agg_type) = query.aggregate.render(catalog, ent, ROOT)?;

    let mut q = QueryBuf::new();
    let where_clause = where_clause(catalog, ent, query.filter.as_ref(), &mut q)?;
    let mut select_parts: Vec<String> = group_cols.iter().map(|c| column_expr(ROOT, c)).collect();
    select_parts.push(format!("{} AS {}", agg_expr, quoted(&query.alias)));

    let grouped: Vec<String> = group_cols
        .iter()
        .map(|c| format!("{}.{}", ROOT, quoted(c.name)))
        .collect();
    let (group_clause, order_clause) = if grouped.is_empty() {
        (String::new(), String::new())
    } else {
        let g = grouped.join(", ");
        (format!(" GROUP BY {}", g), format!(" ORDER BY {}", g))
    };
    let having_clause = match &query.having {
        Some((op, v)) => {
            let n = q.push_param(PgBindValue::from(v));
            format!(" HAVING {} {} ${}::{}", agg_expr, op.sql(), n, agg_type)
        }
        None => String::new(),
    };
    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}{}",
        select_parts.join(", "),
        catalog.table(ent),
        ROOT,
        where_clause,
        group_clause,
        having_clause,
        order_clause
    );
    Ok(q)
}

fn reject_unknown_fields(entity: &EntityDef, fields: &HashMap<String, Value>) -> Result<(), QueryError> {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();
    for k in keys {
        column(entity, k)?;
    }
    Ok(())
}

/// INSERT ... ON CONFLICT DO NOTHING RETURNING the primary key. Columns not present in
/// `fields` are left out, so the database applies their defaults; a missing NOT NULL
/// column is reported by the database.
pub fn insert_or_ignore(catalog: &Catalog, entity_name: &str, fields: &HashMap<String, Value>) -> Result<QueryBuf, QueryError> {
    let ent = entity(catalog, entity_name)?;
    reject_unknown_fields(ent, fields)?;
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &ent.columns {
        let Some(v) = fields.get(c.name) else { continue };
        placeholders.push(q.placeholder(catalog, c, v.clone()));
        cols.push(quoted(c.name));
    }
    let values = if cols.is_empty() {
        "DEFAULT VALUES".to_string()
    } else {
        format!("({}) VALUES ({})", cols.join(", "), placeholders.join(", "))
    };
    let pk_cols = projection(ent, Some(ent.primary_key.as_slice()))?;
    q.sql = format!(
        "INSERT INTO {} AS {} {} ON CONFLICT DO NOTHING RETURNING {}",
        catalog.table(ent),
        ROOT,
        values,
        projection_list(ROOT, &pk_cols)
    );
    Ok(q)
}

/// SELECT projected columns of one row by primary key.
pub fn select_by_id(
    catalog: &Catalog,
    entity_name: &str,
    id: &Value,
    returning: Option<&[&str]>,
) -> Result<QueryBuf, QueryError> {
    let ent = entity(catalog, entity_name)?;
    let pk = single_pk(ent)?;
    let cols = projection(ent, returning)?;
    let mut q = QueryBuf::new();
    let ph = q.placeholder(catalog, pk, id.clone());
    q.sql = format!(
        "SELECT {} FROM {} {} WHERE {}.{} = {}",
        projection_list(ROOT, &cols),
        catalog.table(ent),
        ROOT,
        ROOT,
        quoted(pk.name),
        ph
    );
    Ok(q)
}

/// UPDATE by id: SET exactly the columns present in `changes` (a JSON null sets NULL).
/// With nothing to change this degrades to a SELECT of the current row.
pub fn update_by_id(
    catalog: &Catalog,
    entity_name: &str,
    id: &Value,
    changes: &HashMap<String, Value>,
    returning: Option<&[&str]>,
) -> Result<QueryBuf, QueryError> {
    let ent = entity(catalog, entity_name)?;
    let pk = single_pk(ent)?;
    reject_unknown_fields(ent, changes)?;
    let cols = projection(ent, returning)?;

    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &ent.columns {
        if c.name == pk.name {
            continue;
        }
        let Some(v) = changes.get(c.name) else { continue };
        let rhs = q.placeholder(catalog, c, v.clone());
        sets.push(format!("{} = {}", quoted(c.name), rhs));
    }
    if sets.is_empty() {
        return select_by_id(catalog, entity_name, id, returning);
    }
    let id_ph = q.placeholder(catalog, pk, id.clone());
    q.sql = format!(
        "UPDATE {} AS {} SET {} WHERE {}.{} = {} RETURNING {}",
        catalog.table(ent),
        ROOT,
        sets.join(", "),
        ROOT,
        quoted(pk.name),
        id_ph,
        projection_list(ROOT, &cols)
    );
    Ok(q)
}

/// DELETE by id, returning the projected columns of the removed row.
pub fn delete_by_id(
    catalog: &Catalog,
    entity_name: &str,
    id: &Value,
    returning: Option<&[&str]>,
) -> Result<QueryBuf, QueryError> {
    let ent = entity(catalog, entity_name)?;
    let pk = single_pk(ent)?;
    let cols = projection(ent, returning)?;
    let mut q = QueryBuf::new();
    let ph = q.placeholder(catalog, pk, id.clone());
    q.sql = format!(
        "DELETE FROM {} AS {} WHERE {}.{} = {} RETURNING {}",
        catalog.table(ent),
        ROOT,
        ROOT,
        quoted(pk.name),
        ph,
        projection_list(ROOT, &cols)
    );
    Ok(q)
}
