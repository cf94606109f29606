//! HTTP surface of the stylist service.
//!
//! Routes, CORS, body limits and request tracing around the handlers.

pub mod dto;
pub mod handlers;

pub use handlers::{ApiError, AppState};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router with all endpoints.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::status))
        .route(
            "/api/stylist",
            post(handlers::stylist).options(handlers::preflight),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
