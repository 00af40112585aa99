pub mod routes;

use crate::state::AppState;
use axum::routing::get;
use std::sync::Arc;

/// HTTP surface: JSON only, no rendering.
pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/api/health", get(routes::get_health))
        .route("/api/quote", get(routes::get_quote))
        .route("/api/grid", get(routes::get_grid))
        .route("/api/counters", get(routes::get_counters))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
