use crate::health::{AggregateResponse, Healthchecker};
use axum::{extract::State, routing::get, Router};
use std::sync::Arc;

/// Run one health cycle and answer with its aggregate response
pub async fn health_handler(State(checker): State<Arc<Healthchecker>>) -> AggregateResponse {
    checker.check().await
}

/// Normalize a route path so it always starts with `/`
pub fn normalize_route_path(route_path: &str) -> String {
    if route_path.starts_with('/') {
        route_path.to_string()
    } else {
        format!("/{}", route_path)
    }
}

/// Build a router serving the health endpoint on `route_path` (GET only)
pub fn health_router(checker: Arc<Healthchecker>, route_path: &str) -> Router {
    Router::new()
        .route(&normalize_route_path(route_path), get(health_handler))
        .with_state(checker)
}
