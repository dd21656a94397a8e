//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Cart
//! POST /api/cart/quote         - Price a browser cart (totals, shipping tier, paise)
//!
//! # Payments (rate limited)
//! POST /api/payments/orders    - Create a Razorpay order
//! POST /api/payments/verify    - Verify a Razorpay payment signature
//!
//! # Checkout (rate limited)
//! POST /api/checkout           - Start a checkout attempt
//! POST /api/checkout/callback  - Report the payment modal's result
//! ```

pub mod cart;
pub mod checkout;
pub mod payments;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(payments::create_order))
        .route("/verify", post(payments::verify_payment))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::start))
        .route("/callback", post(checkout::callback))
}

/// Create all routes for the storefront.
///
/// `rate_limiter` guards the payment and checkout routes; pass `None` to
/// serve them unthrottled (tests).
pub fn routes(rate_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let mut money_routes = Router::new()
        .nest("/payments", payment_routes())
        .nest("/checkout", checkout_routes());
    if let Some(layer) = rate_limiter {
        money_routes = money_routes.layer(layer);
    }

    Router::new()
        .route("/health", get(health))
        .route("/api/cart/quote", post(cart::quote))
        .nest("/api", money_routes)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
