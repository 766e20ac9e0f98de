use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::static_files::static_handler;
use super::state::AppState;

// UI Routes - the single form page
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::ui::index_handler).post(handlers::ui::submit_handler),
        )
        .route("/static/{*path}", get(static_handler))
}

// API Routes - JSON access to the same pipeline
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            .route("/query", post(handlers::api::nl_query))
            .route("/status", get(handlers::api::system_status)),
    )
}
