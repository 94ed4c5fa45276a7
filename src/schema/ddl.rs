//! Bootstrap DDL rendered from the catalog: schema, enum types, tables with their constraints.
//! Every statement is idempotent, so bootstrap runs on each start. There is no versioning;
//! changing an existing table is out of scope.

use crate::error::AppError;
use crate::schema::{quoted, validate, Catalog, EntityDef};
use sqlx::PgPool;

fn column_list(cols: &[&str]) -> String {
    cols.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ")
}

fn create_table(catalog: &Catalog, e: &EntityDef) -> String {
    let mut defs: Vec<String> = Vec::new();
    for c in &e.columns {
        let mut def = format!("{} {}", quoted(c.name), c.ty.ddl(&catalog.namespace));
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(d) = c.default {
            def.push_str(" DEFAULT ");
            def.push_str(d.sql());
        }
        defs.push(def);
    }
    defs.push(format!("PRIMARY KEY ({})", column_list(&e.primary_key)));
    for u in &e.unique {
        defs.push(format!("CONSTRAINT {} UNIQUE ({})", quoted(u.name), column_list(&u.columns)));
    }
    for fk in &e.foreign_keys {
        let target = crate::schema::qualified(&catalog.namespace, fk.references);
        defs.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quoted(fk.column),
            target,
            quoted(fk.references_column),
            fk.on_delete.sql()
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        catalog.table(e),
        defs.join(",\n  ")
    )
}

/// All statements, in the order they must run.
pub fn statements(catalog: &Catalog) -> Vec<String> {
    let mut out = vec![format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(&catalog.namespace))];
    for e in &catalog.enums {
        let values: Vec<String> = e.values.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect();
        out.push(format!(
            "DO $$ BEGIN CREATE TYPE {} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
            crate::schema::qualified(&catalog.namespace, e.name),
            values.join(", ")
        ));
    }
    for e in &catalog.entities {
        out.push(create_table(catalog, e));
    }
    out
}

/// Validate the catalog and create whatever does not exist yet.
pub async fn bootstrap(pool: &PgPool, catalog: &Catalog) -> Result<(), AppError> {
    validate(catalog)?;
    for sql in statements(catalog) {
        tracing::debug!(sql = %sql, "bootstrap");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(namespace = %catalog.namespace, tables = catalog.entities.len(), "schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::app_catalog;

    #[test]
    fn schema_and_enum_come_before_tables() {
        let stmts = statements(&app_catalog("app"));
        assert_eq!(stmts[0], r#"CREATE SCHEMA IF NOT EXISTS "app""#);
        assert!(stmts[1].contains(r#"CREATE TYPE "app"."user_role" AS ENUM ('ADMIN', 'BASIC')"#));
        assert!(stmts[2].starts_with(r#"CREATE TABLE IF NOT EXISTS "app"."user""#));
        assert_eq!(stmts.len(), 2 + 5);
    }

    #[test]
    fn user_table_carries_defaults_and_unique_constraints() {
        let stmts = statements(&app_catalog("public"));
        let user = &stmts[2];
        assert!(user.contains(r#""id" uuid NOT NULL DEFAULT gen_random_uuid()"#));
        assert!(user.contains(r#""role" "public"."user_role" NOT NULL DEFAULT 'BASIC'"#));
        assert!(user.contains(r#"CONSTRAINT "user_name_age_unique" UNIQUE ("name", "age")"#));
        assert!(user.contains(r#"CONSTRAINT "user_email_unique" UNIQUE ("email")"#));
    }

    #[test]
    fn nullable_column_has_no_not_null() {
        let mut catalog = app_catalog("public");
        let age = catalog.entities[0].columns.iter_mut().find(|c| c.name == "age").unwrap();
        age.nullable = true;
        let user = &statements(&catalog)[2];
        assert!(user.contains("\"age\" integer,\n"));
        assert!(user.contains(r#""name" varchar(255) NOT NULL"#));
    }

    #[test]
    fn cascade_only_on_preferences() {
        let stmts = statements(&app_catalog("public"));
        let prefs = stmts.iter().find(|s| s.contains(r#""public"."user_preferences" ("#)).unwrap();
        assert!(prefs.contains(r#"REFERENCES "public"."user" ("id") ON DELETE CASCADE"#));
        let post = stmts.iter().find(|s| s.contains(r#""public"."post" ("#)).unwrap();
        assert!(post.contains(r#"REFERENCES "public"."user" ("id") ON DELETE NO ACTION"#));
    }

    #[test]
    fn join_table_has_composite_primary_key() {
        let stmts = statements(&app_catalog("public"));
        let last = stmts.last().unwrap();
        assert!(last.contains(r#"PRIMARY KEY ("post_id", "category_id")"#));
    }
}
