//! Schema definitions: the catalog of entities and relations, its validation, and bootstrap DDL.

pub mod catalog;
pub mod ddl;
pub mod types;
pub mod validator;

pub use catalog::*;
pub use ddl::{bootstrap, statements};
pub use types::*;
pub use validator::validate;

/// Quote identifier for PostgreSQL (safe: only from the catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Schema-qualified name, both parts quoted.
pub fn qualified(namespace: &str, name: &str) -> String {
    format!("{}.{}", quoted(namespace), quoted(name))
}
