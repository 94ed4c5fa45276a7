//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Settings read from the environment at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Catalog integrity problems, detected before any statement is issued.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("missing reference: {kind} '{name}'")]
    MissingReference { kind: &'static str, name: String },
    #[error("invalid primary key: entity {entity} column {column}")]
    InvalidPrimaryKey { entity: String, column: String },
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    #[error("duplicate relation '{relation}' on entity {entity}")]
    DuplicateRelation { entity: String, relation: String },
}

/// A query shape that does not fit the catalog.
#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("unknown column '{column}' on {entity}")]
    UnknownColumn { entity: String, column: String },
    #[error("unknown relation '{relation}' on {entity}")]
    UnknownRelation { entity: String, relation: String },
    #[error("selection revisits {entity} via {path}")]
    RelationCycle { entity: String, path: String },
    #[error("relation '{0}' cannot be used as a flat join")]
    UnsupportedJoin(String),
    #[error("duplicate output column: {0}")]
    DuplicateOutput(String),
    #[error("{0} has a composite primary key; address rows by column filters instead")]
    CompositeKey(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            AppError::Query(_) | AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        };
        // Driver errors carry constraint names and SQL fragments; keep them in the log only.
        let message = match &self {
            AppError::Db(e) => {
                tracing::error!(error = %e, "database error");
                "database error".to_string()
            }
            AppError::Schema(e) => {
                tracing::error!(error = %e, "schema error");
                self.to_string()
            }
            _ => self.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
