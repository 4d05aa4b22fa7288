use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::infrastructure::repositories::SubscriptionStore;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(store): State<Arc<dyn SubscriptionStore>>) -> impl IntoResponse {
    if store.check_connection().await {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "storage": "connected"
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "storage": "disconnected"
            })),
        )
    }
}
