use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::web_context::WebContextService;

pub mod handlers;
pub mod models;

pub fn create_router(service: Arc<WebContextService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health_handler))
        .route("/api/retrieve", post(handlers::retrieve_handler))
        .route("/api/enhance", post(handlers::enhance_handler))
        .with_state(service)
        .layer(cors)
}
