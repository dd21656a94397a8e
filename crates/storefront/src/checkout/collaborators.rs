//! External collaborators of the checkout.
//!
//! The orchestrator only talks to the outside world through these traits.
//! Production wires in [`crate::supabase::SupabaseClient`] and
//! [`crate::payments::RazorpayClient`]; tests substitute in-memory fakes.

use async_trait::async_trait;
use nutriio_core::{OrderId, OrderNumber, UserId};
use thiserror::Error;

use crate::models::{
    GatewayOrder, GatewayOrderRequest, GatewayOutcome, GatewaySession, NewOrder, NewOrderItem,
    OrderRecord, OrderStatusUpdate, PaymentConfirmation, Profile, SavedAddress,
};

/// Errors from the persistence backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Expected row was not returned.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend is not reachable or not configured.
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The operation cannot run on this side of the integration.
    #[error("Unsupported gateway operation: {0}")]
    Unsupported(&'static str),

    /// Gateway is not reachable or not configured.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// The backend that owns addresses, profiles and orders.
#[async_trait]
pub trait StorePersistence: Send + Sync {
    /// Saved addresses for a user, default first then newest first.
    async fn list_addresses(&self, user_id: &UserId)
    -> Result<Vec<SavedAddress>, PersistenceError>;

    /// Profile defaults, `None` when the user has no profile row.
    async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>, PersistenceError>;

    /// Allocate a fresh human-readable order number.
    async fn generate_order_number(&self) -> Result<OrderNumber, PersistenceError>;

    /// Insert an order header and return the stored row.
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, PersistenceError>;

    /// Batch-insert order lines.
    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<(), PersistenceError>;

    /// Apply a status transition to an existing order.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        update: &OrderStatusUpdate,
    ) -> Result<OrderRecord, PersistenceError>;
}

/// Gateway order creation and hosted checkout session.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a gateway order for an amount in paise.
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Open the hosted checkout and wait for the shopper to finish.
    async fn open_session(&self, session: &GatewaySession)
    -> Result<GatewayOutcome, GatewayError>;
}

/// Server-side check that a success payload really came from the gateway.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// `Ok(true)` when the signature matches.
    async fn verify(&self, confirmation: &PaymentConfirmation) -> Result<bool, GatewayError>;
}
