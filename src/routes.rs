use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{handler::properties::property_handler, AppState};

/// Headroom for the non-file parts of an upload.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;
const IMAGE_SLOTS: usize = 5;

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let upload_limit =
        app_state.property_service.media().max_size_bytes() * IMAGE_SLOTS + MULTIPART_OVERHEAD;

    let api_route = Router::new()
        .nest("/properties", property_handler(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state.clone()));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_route)
        .nest_service(
            &app_state.env.media_url,
            ServeDir::new(&app_state.env.media_root),
        )
}
