//! Catalog validation: referential integrity of entities, constraints and relations.

use crate::error::SchemaError;
use crate::schema::{Catalog, ColumnType, EntityDef};
use std::collections::HashSet;

fn require_column(entity: &EntityDef, column: &str) -> Result<(), SchemaError> {
    if entity.column(column).is_none() {
        return Err(SchemaError::MissingReference {
            kind: "column",
            name: format!("{}.{}", entity.name, column),
        });
    }
    Ok(())
}

fn require_entity<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a EntityDef, SchemaError> {
    catalog.entity(name).ok_or_else(|| SchemaError::MissingReference {
        kind: "entity",
        name: name.to_string(),
    })
}

pub fn validate(catalog: &Catalog) -> Result<(), SchemaError> {
    let enum_names: HashSet<&str> = catalog.enums.iter().map(|e| e.name).collect();

    let mut seen = HashSet::new();
    for (pos, e) in catalog.entities.iter().enumerate() {
        if !seen.insert(e.name) {
            return Err(SchemaError::DuplicateEntity(e.name.to_string()));
        }
        if e.primary_key.is_empty() {
            return Err(SchemaError::InvalidPrimaryKey {
                entity: e.name.to_string(),
                column: String::new(),
            });
        }
        for pk in &e.primary_key {
            if e.column(pk).is_none() {
                return Err(SchemaError::InvalidPrimaryKey {
                    entity: e.name.to_string(),
                    column: pk.to_string(),
                });
            }
        }
        for c in &e.columns {
            if let ColumnType::Enum(name) = c.ty {
                if !enum_names.contains(name) {
                    return Err(SchemaError::MissingReference {
                        kind: "enum",
                        name: name.to_string(),
                    });
                }
            }
        }
        for u in &e.unique {
            for col in &u.columns {
                require_column(e, col)?;
            }
        }
        // DDL runs in catalog order, so a referenced table must already be declared.
        let declared: HashSet<&str> = catalog.entities[..pos].iter().map(|d| d.name).collect();
        for fk in &e.foreign_keys {
            require_column(e, fk.column)?;
            let target = require_entity(catalog, fk.references)?;
            require_column(target, fk.references_column)?;
            if !declared.contains(fk.references) && fk.references != e.name {
                return Err(SchemaError::MissingReference {
                    kind: "previously declared entity",
                    name: fk.references.to_string(),
                });
            }
        }
    }

    let mut relation_names = HashSet::new();
    for r in &catalog.relations {
        if !relation_names.insert((r.source, r.name)) {
            return Err(SchemaError::DuplicateRelation {
                entity: r.source.to_string(),
                relation: r.name.to_string(),
            });
        }
        let source = require_entity(catalog, r.source)?;
        let target = require_entity(catalog, r.target)?;
        require_column(source, r.source_column)?;
        require_column(target, r.target_column)?;
        if let Some(through) = &r.through {
            let join = require_entity(catalog, through.entity)?;
            require_column(join, through.source_column)?;
            require_column(join, through.target_column)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{app_catalog, Cardinality, RelationDef, USER};

    #[test]
    fn rejects_relation_to_unknown_column() {
        let mut catalog = app_catalog("public");
        catalog.relations.push(RelationDef {
            name: "friends",
            source: USER,
            target: USER,
            cardinality: Cardinality::OneToMany,
            source_column: "id",
            target_column: "friend_id",
            through: None,
        });
        let err = validate(&catalog).unwrap_err();
        assert!(matches!(err, SchemaError::MissingReference { kind: "column", .. }));
    }

    #[test]
    fn rejects_duplicate_relation_name() {
        let mut catalog = app_catalog("public");
        let dup = catalog.relations[0].clone();
        catalog.relations.push(dup);
        assert!(matches!(
            validate(&catalog).unwrap_err(),
            SchemaError::DuplicateRelation { .. }
        ));
    }

    #[test]
    fn rejects_foreign_key_before_its_target() {
        let mut catalog = app_catalog("public");
        catalog.entities.swap(0, 1);
        assert!(matches!(
            validate(&catalog).unwrap_err(),
            SchemaError::MissingReference { kind: "previously declared entity", .. }
        ));
    }

    #[test]
    fn rejects_unknown_enum() {
        let mut catalog = app_catalog("public");
        catalog.enums.clear();
        assert!(matches!(
            validate(&catalog).unwrap_err(),
            SchemaError::MissingReference { kind: "enum", .. }
        ));
    }
}
