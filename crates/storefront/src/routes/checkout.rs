//! Checkout route handlers.
//!
//! `POST /api/checkout` starts an attempt. The response either ends the
//! attempt (validation problem, WhatsApp booking, backend failure) or carries
//! the gateway session the browser opens the Razorpay modal with. The modal's
//! result comes back on `POST /api/checkout/callback`, which answers with the
//! attempt's final report.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use nutriio_core::GatewayOrderId;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{info, instrument};

use crate::cart::{CartLineItem, CartStore, MemoryStorage};
use crate::checkout::{
    CheckoutError, CheckoutOrchestrator, CheckoutOutcome, CheckoutRequest, CheckoutState,
    CheckoutView,
};
use crate::error::{AppError, Result};
use crate::models::{GatewayOutcome, GatewaySession, PaymentConfirmation};
use crate::payments::{AttemptReport, HostedGateway};
use crate::state::AppState;

/// Start-checkout body: the browser's cart plus the checkout form.
#[derive(Debug, Deserialize)]
pub struct StartCheckout {
    pub items: Vec<CartLineItem>,
    #[serde(flatten)]
    pub request: CheckoutRequest,
}

/// What the browser reports after the modal closes.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutCallback {
    Success(PaymentConfirmation),
    Failed {
        order_ref: GatewayOrderId,
        #[serde(default)]
        reason: Option<String>,
    },
    Dismissed {
        order_ref: GatewayOrderId,
    },
}

impl CheckoutCallback {
    fn into_parts(self) -> (GatewayOrderId, GatewayOutcome) {
        match self {
            Self::Success(confirmation) => (
                confirmation.order_id.clone(),
                GatewayOutcome::Succeeded(confirmation),
            ),
            Self::Failed { order_ref, reason } => (
                order_ref,
                GatewayOutcome::Failed {
                    reason: reason.unwrap_or_else(|| "payment failed".to_string()),
                },
            ),
            Self::Dismissed { order_ref } => (order_ref, GatewayOutcome::Dismissed),
        }
    }
}

/// Checkout response body.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub state: CheckoutState,
    pub view: CheckoutView,
    /// The browser should empty its stored cart.
    pub cart_cleared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CheckoutOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<GatewaySession>,
}

/// Start a checkout attempt.
#[instrument(skip_all)]
pub async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<StartCheckout>, JsonRejection>,
) -> Result<Response> {
    let Json(StartCheckout { items, request }) =
        body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut cart = CartStore::restore(MemoryStorage::new(), items)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let persistence = match bearer_token(&headers) {
        Some(token) => state.supabase().for_user(token),
        None => state.supabase().clone(),
    };
    let (gateway, opened) = HostedGateway::new(
        state.razorpay().clone(),
        state.sessions().clone(),
        state.session_ttl(),
    );
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence,
        gateway,
        state.razorpay().clone(),
        state.checkout_settings().clone(),
    );

    let (finished_tx, finished_rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = orchestrator.submit(&mut cart, &request).await;
        let _ = finished_tx.send(AttemptReport {
            result,
            state: orchestrator.state(),
            cart_cleared: cart.is_empty(),
        });
    });

    // The announcer closes without a session when the attempt ends early.
    if let Ok(session) = opened.await {
        state.sessions().attach(&session.order_ref, finished_rx)?;
        info!(order_ref = %session.order_ref, "Checkout awaiting payment");
        let body = CheckoutResponse {
            success: true,
            state: CheckoutState::GatewayOpen,
            view: CheckoutView::Checkout {
                message: "Complete the payment to place your order.".to_string(),
            },
            cart_cleared: false,
            outcome: None,
            session: Some(session),
        };
        return Ok(Json(body).into_response());
    }

    let report = finished_rx
        .await
        .map_err(|_| AppError::Internal("checkout attempt ended without a report".to_string()))?;
    Ok(report_response(report))
}

/// Deliver the modal's result and answer with the final report.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    body: std::result::Result<Json<CheckoutCallback>, JsonRejection>,
) -> Result<Response> {
    let Json(callback) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (order_ref, outcome) = callback.into_parts();

    let finished = state.sessions().resolve(&order_ref, outcome)?;
    let report = finished
        .await
        .map_err(|_| AppError::Internal("checkout attempt ended without a report".to_string()))?;
    Ok(report_response(report))
}

fn report_response(report: AttemptReport) -> Response {
    let AttemptReport {
        result,
        state,
        cart_cleared,
    } = report;

    match result {
        Ok(outcome) => {
            let body = CheckoutResponse {
                success: matches!(outcome, CheckoutOutcome::Paid(_)),
                state,
                view: outcome.view(),
                cart_cleared,
                outcome: Some(outcome),
                session: None,
            };
            Json(body).into_response()
        }
        Err(error) => {
            let status = checkout_error_status(&error);
            let body = CheckoutResponse {
                success: false,
                state,
                view: error.view(),
                cart_cleared,
                outcome: None,
                session: None,
            };
            (status, Json(body)).into_response()
        }
    }
}

const fn checkout_error_status(error: &CheckoutError) -> StatusCode {
    match error {
        CheckoutError::EmptyCart | CheckoutError::Validation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CheckoutError::Amount(_) => StatusCode::BAD_REQUEST,
        CheckoutError::Persistence(_) | CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::OrderMismatch { .. }
        | CheckoutError::SignatureRejected { .. }
        | CheckoutError::VerificationUnavailable { .. } => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::PaidButUnrecorded { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
