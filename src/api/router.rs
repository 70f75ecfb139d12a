//! Router construction.

use std::path::Path;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::state::AppState;

/// Build the application router
///
/// When `static_dir` is given, unmatched paths are served from it with
/// `index.html` as the fallback so the map front end can route client-side.
pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/data", get(handlers::get_data))
        .route("/api/all-data", get(handlers::get_all_data))
        .route("/api/recent", get(handlers::get_recent))
        .route("/api/recent/stream", get(handlers::recent_stream));

    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
