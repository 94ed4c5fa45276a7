//! User CRUD service: a small REST backend over users, their preferences, posts and categories.

pub mod case;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod relation;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod users;

pub use error::{AppError, ConfigError, QueryError, SchemaError};
pub use relation::Selection;
pub use response::{success_many, success_one};
pub use routes::{app_router, common_routes, user_routes};
pub use schema::{app_catalog, bootstrap, Catalog};
pub use service::CrudService;
pub use settings::Settings;
pub use state::AppState;
