use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{media_get, search, subscriptions, upload};
use crate::state::AppState;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Base64 inflates payloads by ~4/3; leave headroom over the raw limit.
    let body_limit = state.config.max_upload_size_bytes * 3 / 2;

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/upload", post(upload::upload))
        .route("/api/v1/media/search", get(search::search_media))
        .route("/api/v1/media/{id}", get(media_get::get_media))
        .route(
            "/api/v1/subscriptions",
            post(subscriptions::subscribe).delete(subscriptions::unsubscribe),
        )
        .route(
            "/api/v1/subscriptions/settings",
            get(subscriptions::get_settings),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
