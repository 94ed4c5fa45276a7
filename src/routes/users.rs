//! User routes. PUT creates, POST updates, DELETE removes; the id travels in the body.

use crate::handlers::users::{create_user, delete_user, list_users, list_users_sqlstyle, update_user};
use crate::state::AppState;
use axum::{routing::get, routing::put, Router};

pub fn user_routes(state: AppState) -> Router {
    Router::new()
        .route("/user", put(create_user).post(update_user).delete(delete_user))
        .route("/users", get(list_users))
        .route("/users/sqlstyle", get(list_users_sqlstyle))
        .with_state(state)
}
