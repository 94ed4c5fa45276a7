//! Relation resolver: turns a selection tree into a plan of aliased tables and renders
//! each related entity as a correlated JSON subquery, so one statement returns the whole tree.

use crate::error::QueryError;
use crate::schema::{qualified, quoted, Catalog, ColumnDef, EntityDef, RelationDef};
use crate::sql::filter::column;
use std::collections::HashSet;

/// Which columns of an entity to return, and which relations to nest under it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    /// `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub with: Vec<(String, Selection)>,
}

impl Selection {
    pub fn all() -> Self {
        Selection::default()
    }

    pub fn columns(cols: &[&str]) -> Self {
        Selection {
            columns: Some(cols.iter().map(|c| c.to_string()).collect()),
            with: Vec::new(),
        }
    }

    pub fn with(mut self, relation: &str, child: Selection) -> Self {
        self.with.push((relation.to_string(), child));
        self
    }
}

/// One entity in a resolved selection.
#[derive(Debug)]
pub struct PlanNode<'a> {
    pub entity: &'a EntityDef,
    pub alias: String,
    pub columns: Vec<&'a ColumnDef>,
    pub children: Vec<PlanChild<'a>>,
}

#[derive(Debug)]
pub struct PlanChild<'a> {
    pub relation: &'a RelationDef,
    pub node: PlanNode<'a>,
}

/// Resolve `selection` rooted at entity `root`. Aliases are `t0` for the root, then `t1`, `t2`, ...
/// in depth-first order.
pub fn resolve<'a>(catalog: &'a Catalog, root: &str, selection: &Selection) -> Result<PlanNode<'a>, QueryError> {
    let entity = catalog
        .entity(root)
        .ok_or_else(|| QueryError::UnknownEntity(root.to_string()))?;
    let mut next_alias = 0;
    let mut path = Vec::new();
    resolve_node(catalog, entity, selection, &mut next_alias, &mut path)
}

fn resolve_node<'a>(
    catalog: &'a Catalog,
    entity: &'a EntityDef,
    selection: &Selection,
    next_alias: &mut usize,
    path: &mut Vec<&'a str>,
) -> Result<PlanNode<'a>, QueryError> {
    if path.contains(&entity.name) {
        let mut trail = path.clone();
        trail.push(entity.name);
        return Err(QueryError::RelationCycle {
            entity: entity.name.to_string(),
            path: trail.join(" -> "),
        });
    }

    let alias = format!("t{}", *next_alias);
    *next_alias += 1;

    let columns: Vec<&ColumnDef> = match &selection.columns {
        None => entity.columns.iter().collect(),
        Some(cols) => cols.iter().map(|c| column(entity, c)).collect::<Result<_, _>>()?,
    };

    let mut outputs: HashSet<&str> = HashSet::new();
    for c in &columns {
        if !outputs.insert(c.name) {
            return Err(QueryError::DuplicateOutput(c.name.to_string()));
        }
    }

    path.push(entity.name);
    let mut children = Vec::with_capacity(selection.with.len());
    for (name, child) in &selection.with {
        let relation = catalog
            .relation(entity.name, name)
            .ok_or_else(|| QueryError::UnknownRelation {
                entity: entity.name.to_string(),
                relation: name.clone(),
            })?;
        if !outputs.insert(relation.name) {
            return Err(QueryError::DuplicateOutput(relation.name.to_string()));
        }
        let target = catalog
            .entity(relation.target)
            .ok_or_else(|| QueryError::UnknownEntity(relation.target.to_string()))?;
        let node = resolve_node(catalog, target, child, next_alias, path)?;
        children.push(PlanChild { relation, node });
    }
    path.pop();

    Ok(PlanNode {
        entity,
        alias,
        columns,
        children,
    })
}

/// `alias."col" AS "col"`, reading enum columns as text.
pub(crate) fn column_expr(alias: &str, c: &ColumnDef) -> String {
    let cast = if c.ty.read_as_text() { "::text" } else { "" };
    format!("{}.{}{} AS {}", alias, quoted(c.name), cast, quoted(c.name))
}

impl PlanNode<'_> {
    /// SELECT-list for this node: its columns, then one subquery per nested relation.
    pub fn select_list(&self, catalog: &Catalog) -> Vec<String> {
        let mut parts: Vec<String> = self.columns.iter().map(|c| column_expr(&self.alias, c)).collect();
        for child in &self.children {
            parts.push(format!(
                "{} AS {}",
                child.subquery(catalog, &self.alias),
                quoted(child.relation.name)
            ));
        }
        parts
    }

    fn order_by_pk(&self) -> String {
        self.entity
            .primary_key
            .iter()
            .map(|pk| format!("{}.{}", self.alias, quoted(pk)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PlanChild<'_> {
    /// Correlated scalar subquery: a JSON array for to-many relations, an object or null for to-one.
    fn subquery(&self, catalog: &Catalog, parent_alias: &str) -> String {
        let rel = self.relation;
        let node = &self.node;
        let alias = &node.alias;
        let from = match &rel.through {
            None => format!(
                "{} {} WHERE {}.{} = {}.{}",
                catalog.table(node.entity),
                alias,
                alias,
                quoted(rel.target_column),
                parent_alias,
                quoted(rel.source_column)
            ),
            Some(through) => {
                let join_alias = format!("{}_j", alias);
                format!(
                    "{} {} JOIN {} {} ON {}.{} = {}.{} WHERE {}.{} = {}.{}",
                    catalog.table(node.entity),
                    alias,
                    qualified(&catalog.namespace, through.entity),
                    join_alias,
                    join_alias,
                    quoted(through.target_column),
                    alias,
                    quoted(rel.target_column),
                    join_alias,
                    quoted(through.source_column),
                    parent_alias,
                    quoted(rel.source_column)
                )
            }
        };
        let inner = format!("SELECT {} FROM {}", node.select_list(catalog).join(", "), from);
        if rel.cardinality.is_to_many() {
            format!(
                "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM ({} ORDER BY {}) sub)",
                inner,
                node.order_by_pk()
            )
        } else {
            format!("(SELECT row_to_json(sub) FROM ({} LIMIT 1) sub)", inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{app_catalog, POST, USER};

    #[test]
    fn aliases_follow_depth_first_order() {
        let catalog = app_catalog("public");
        let sel = Selection::columns(&["name"])
            .with("preferences", Selection::columns(&["email_updates"]))
            .with("posts", Selection::all().with("postCategories", Selection::all()));
        let plan = resolve(&catalog, USER, &sel).unwrap();
        assert_eq!(plan.alias, "t0");
        assert_eq!(plan.children[0].node.alias, "t1");
        assert_eq!(plan.children[1].node.alias, "t2");
        assert_eq!(plan.children[1].node.children[0].node.alias, "t3");
        assert_eq!(plan.children[1].node.columns.len(), 6);
    }

    #[test]
    fn to_one_renders_object_subquery() {
        let catalog = app_catalog("app");
        let sel = Selection::columns(&["name", "role"]).with("preferences", Selection::columns(&["email_updates"]));
        let plan = resolve(&catalog, USER, &sel).unwrap();
        let list = plan.select_list(&catalog);
        assert_eq!(list[0], r#"t0."name" AS "name""#);
        assert_eq!(list[1], r#"t0."role"::text AS "role""#);
        assert_eq!(
            list[2],
            r#"(SELECT row_to_json(sub) FROM (SELECT t1."email_updates" AS "email_updates" FROM "app"."user_preferences" t1 WHERE t1."user_id" = t0."id" LIMIT 1) sub) AS "preferences""#
        );
    }

    #[test]
    fn to_many_renders_ordered_array_subquery() {
        let catalog = app_catalog("app");
        let sel = Selection::columns(&[]).with("posts", Selection::columns(&["title"]));
        let plan = resolve(&catalog, USER, &sel).unwrap();
        assert_eq!(
            plan.select_list(&catalog),
            vec![r#"(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT t1."title" AS "title" FROM "app"."post" t1 WHERE t1."author_id" = t0."id" ORDER BY t1."id") sub) AS "posts""#]
        );
    }

    #[test]
    fn many_to_many_joins_through_join_entity() {
        let catalog = app_catalog("app");
        let sel = Selection::columns(&["title"]).with("categories", Selection::columns(&["name"]));
        let plan = resolve(&catalog, POST, &sel).unwrap();
        let list = plan.select_list(&catalog);
        assert!(list[1].contains(
            r#"FROM "app"."category" t1 JOIN "app"."post_category" t1_j ON t1_j."category_id" = t1."id" WHERE t1_j."post_id" = t0."id""#
        ));
    }

    #[test]
    fn nesting_depth_is_unbounded_by_the_resolver() {
        let catalog = app_catalog("public");
        let sel = Selection::all().with(
            "posts",
            Selection::all().with(
                "postCategories",
                Selection::all().with("category", Selection::columns(&["name"])),
            ),
        );
        let plan = resolve(&catalog, USER, &sel).unwrap();
        let list = plan.select_list(&catalog).join(", ");
        assert!(list.contains(r#"WHERE t3."id" = t2."category_id""#));
    }

    #[test]
    fn revisiting_an_entity_is_a_cycle() {
        let catalog = app_catalog("public");
        let sel = Selection::all().with("posts", Selection::all().with("author", Selection::all()));
        let err = resolve(&catalog, USER, &sel).unwrap_err();
        assert_eq!(
            err,
            QueryError::RelationCycle {
                entity: "user".into(),
                path: "user -> post -> user".into()
            }
        );
    }

    #[test]
    fn unknown_relation_and_column_are_rejected() {
        let catalog = app_catalog("public");
        let err = resolve(&catalog, USER, &Selection::all().with("comments", Selection::all())).unwrap_err();
        assert!(matches!(err, QueryError::UnknownRelation { .. }));
        let err = resolve(&catalog, USER, &Selection::columns(&["nickname"])).unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn { .. }));
        let err = resolve(&catalog, "comment", &Selection::all()).unwrap_err();
        assert_eq!(err, QueryError::UnknownEntity("comment".into()));
    }
}
