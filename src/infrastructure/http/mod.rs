pub mod request_id;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, quota::QuotaController};
use crate::infrastructure::config::Config;
use crate::infrastructure::repositories::SubscriptionStore;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Build the application router with all routes configured
pub fn build_router(
    store: Arc<dyn SubscriptionStore>,
    quota_controller: Arc<QuotaController>,
) -> Router {
    let quota_routes = Router::new()
        .route("/api/users/:user_id/quota", get(QuotaController::check_quota))
        .route("/api/users/:user_id/questions", post(QuotaController::ask_question))
        .route(
            "/api/users/:user_id/questions/record",
            post(QuotaController::record_question),
        )
        .route(
            "/api/users/:user_id/conversations",
            post(QuotaController::record_conversation),
        )
        .route("/api/users/:user_id/usage", get(QuotaController::get_usage))
        .route(
            "/api/users/:user_id/subscription",
            put(QuotaController::set_tier),
        )
        .with_state(quota_controller);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(store)
        .merge(quota_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn start_http_server(
    config: Arc<Config>,
    app: Router,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
