//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes over the funding workflows
//! - Caller identity extractors
//! - Validated JSON extraction
//! - The success and error envelopes

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;


use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use carefund_core::FundingService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger and workflows over the configured store and gateway.
    pub funding: FundingService,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
