//! Razorpay payment route handlers.
//!
//! Server-side halves of the browser checkout: creating a gateway order
//! (the key secret never leaves the server) and verifying the signature the
//! modal hands back.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use nutriio_core::{CurrencyCode, to_minor_units};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::checkout::PaymentGateway;
use crate::error::{AppError, Result};
use crate::models::{GatewayOrder, GatewayOrderRequest, PaymentConfirmation};
use crate::state::AppState;

/// Order creation request. `amount` is in rupees.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: GatewayOrder,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
}

/// Create a Razorpay order for an amount in rupees.
#[instrument(skip(state, body))]
pub async fn create_order(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<CreateOrderResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let amount = to_minor_units(body.amount).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if amount == 0 {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }

    let currency = match body.currency.as_deref().map(str::trim) {
        None | Some("") => CurrencyCode::INR,
        Some(code) => code
            .parse::<CurrencyCode>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
    };
    let receipt = body
        .receipt
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| format!("receipt_{}", Utc::now().timestamp_millis()));

    let order = state
        .razorpay()
        .create_order(&GatewayOrderRequest {
            amount,
            currency,
            receipt,
        })
        .await?;

    info!(gateway_order_id = %order.id, amount_paise = amount, "Payment order created");
    Ok(Json(CreateOrderResponse {
        success: true,
        order,
    }))
}

/// Check a payment signature. Always answers `{success: bool}`.
#[instrument(skip(state, body))]
pub async fn verify_payment(
    State(state): State<AppState>,
    body: std::result::Result<Json<PaymentConfirmation>, JsonRejection>,
) -> Result<Json<VerifyResponse>> {
    let Json(confirmation) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let success = state.razorpay().verify_signature(&confirmation);
    if success {
        info!(payment_id = %confirmation.payment_id, "Payment signature verified");
    } else {
        warn!(
            payment_id = %confirmation.payment_id,
            gateway_order_id = %confirmation.order_id,
            "Payment signature mismatch"
        );
    }

    Ok(Json(VerifyResponse { success }))
}
