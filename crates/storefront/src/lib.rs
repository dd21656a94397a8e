//! Nutriio Storefront library.
//!
//! Cart engine, checkout orchestration and the payment endpoints behind the
//! Nutriio storefront. The binary in `main.rs` is a thin wrapper around
//! [`app`]; the library form lets the integration tests drive the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod state;
pub mod supabase;

use axum::{Router, http::Request};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info_span;

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Build the storefront router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState, rate_limiter: Option<RateLimiterLayer>) -> Router {
    routes::routes(rate_limiter)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
