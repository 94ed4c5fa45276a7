//! User handlers: create (insert-or-ignore), nested list, SQL-style list, update, delete.

use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{success_many, success_one};
use crate::schema::USER;
use crate::state::AppState;
use crate::users::{shared_names, users_with_preferences, CreateUser, DeleteUser, ListUsersParams, UpdateUser, USER_PROJECTION};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
};
use serde_json::{json, Value};

pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    let fields = body.into_fields()?;
    let created = state.crud.create_or_ignore(USER, &fields).await?;
    Ok(success_one(created.unwrap_or(Value::Null)))
}

pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<ListUsersParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let rows = state.crud.read(&params.to_query()).await?;
    Ok(success_many(rows))
}

pub async fn list_users_sqlstyle(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let joined = users_with_preferences();
    let grouped = shared_names();
    let (users1, users2) = tokio::try_join!(state.crud.read_joined(&joined), state.crud.read_grouped(&grouped))?;
    Ok(success_one(json!({ "users1": users1, "users2": users2 })))
}

pub async fn update_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UpdateUser>,
) -> Result<impl IntoResponse, AppError> {
    let (id, changes) = body.into_changes()?;
    let rows = state
        .crud
        .update_by_id(USER, &json!(id), &changes, Some(USER_PROJECTION))
        .await?;
    Ok(success_many(rows))
}

pub async fn delete_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DeleteUser>,
) -> Result<impl IntoResponse, AppError> {
    let id = body.id()?;
    let rows = state.crud.delete_by_id(USER, &json!(id), Some(USER_PROJECTION)).await?;
    if rows.is_empty() {
        tracing::debug!(%id, "delete matched no user");
    }
    Ok(success_many(rows))
}
