use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, records};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config().server.max_upload_bytes;

    // API routes
    let api_routes = Router::new()
        // Health and capabilities
        .route("/health", get(handlers::health))
        .route("/formats", get(handlers::list_formats))
        .route("/converter/status", get(handlers::converter_status))
        // Records
        .route(
            "/records",
            post(records::upload_record).get(records::list_records),
        )
        .route(
            "/records/{id}",
            get(records::get_record).delete(records::delete_record),
        )
        .route("/records/{id}/convert", post(records::convert_record))
        .route("/records/{id}/download", get(records::download_record))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
