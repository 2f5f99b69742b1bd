//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The portal's only server-side surface: the database reset maintenance
//! function and a liveness probe. Everything else talks to the hosted
//! platform directly.

pub mod maintenance;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use axum::Router;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub const RESET_DB_PATH: &str = "/functions/v1/reset-db";

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, HeaderName::from_static("apikey"), header::CONTENT_TYPE])
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(RESET_DB_PATH, post(maintenance::reset_db))
        .route("/healthz", get(healthz))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
