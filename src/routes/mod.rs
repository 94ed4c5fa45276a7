//! Router assembly: common routes plus user routes, with request tracing and a body size limit.

pub mod common;
pub mod users;

pub use common::common_routes;
pub use users::user_routes;

use crate::state::AppState;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub fn app_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(user_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::app_catalog;
    use crate::service::CrudService;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Router over a pool that never connects; only requests rejected before any
    /// statement runs can be exercised here.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let crud = CrudService::new(pool, Arc::new(app_catalog("public")));
        app_router(AppState { crud }, 1024)
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn error_message(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["error"]["message"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_without_email_is_400() {
        let response = app()
            .oneshot(json_request("PUT", "/user", r#"{"name": "Alice", "age": 30}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "bad request: email is required");
    }

    #[tokio::test]
    async fn create_with_unknown_role_is_400() {
        let response = app()
            .oneshot(json_request(
                "PUT",
                "/user",
                r#"{"name": "Alice", "age": 30, "email": "a@x.com", "role": "ROOT"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let response = app()
            .oneshot(json_request("PUT", "/user", r#"{"name": "#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_without_id_is_400() {
        let response = app()
            .oneshot(json_request("POST", "/user", r#"{"age": 22}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "bad request: id is required");
    }

    #[tokio::test]
    async fn delete_without_id_is_400() {
        let response = app()
            .oneshot(json_request("DELETE", "/user", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "bad request: id is required");
    }

    #[tokio::test]
    async fn delete_with_invalid_uuid_is_400() {
        let response = app()
            .oneshot(json_request("DELETE", "/user", r#"{"id": "not-a-uuid"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_with_unknown_sort_column_is_400() {
        let response = app()
            .oneshot(Request::builder().uri("/users?sort=nickname").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "unknown column 'nickname' on user");
    }

    #[tokio::test]
    async fn list_with_non_numeric_limit_is_400() {
        let response = app()
            .oneshot(Request::builder().uri("/users?limit=many").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let big = format!(r#"{{"name": "{}", "age": 1, "email": "e"}}"#, "x".repeat(4096));
        let request = Request::builder()
            .method("PUT")
            .uri("/user")
            .header("content-type", "application/json")
            .header("content-length", big.len().to_string())
            .body(Body::from(big))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
