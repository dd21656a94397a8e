//! Razorpay Orders API client.
//!
//! Creates gateway orders server-side and verifies checkout signatures with
//! the key secret. The payment modal itself runs in the browser; see
//! [`super::HostedGateway`] for how its result reaches the orchestrator.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::signature::verify_payment_signature;
use crate::checkout::{GatewayError, PaymentGateway, SignatureVerifier};
use crate::config::RazorpayConfig;
use crate::models::{
    GatewayOrder, GatewayOrderRequest, GatewayOutcome, GatewaySession, PaymentConfirmation,
};

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("api_base", &self.api_base)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Error body returned by Razorpay.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            api_base: config.api_base.as_str().trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    /// Public key id.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Verify a checkout signature with the key secret.
    #[must_use]
    pub fn verify_signature(&self, confirmation: &PaymentConfirmation) -> bool {
        verify_payment_signature(
            self.key_secret.expose_secret(),
            confirmation.order_id.as_str(),
            confirmation.payment_id.as_str(),
            &confirmation.signature,
        )
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self, request), fields(amount = request.amount, receipt = %request.receipt))]
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders", self.api_base);
        let body = serde_json::json!({
            "amount": request.amount,
            "currency": request.currency.code(),
            "receipt": request.receipt,
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&raw)
                .ok()
                .and_then(|e| e.error.description)
                .unwrap_or(raw);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        debug!(gateway_order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    async fn open_session(
        &self,
        _session: &GatewaySession,
    ) -> Result<GatewayOutcome, GatewayError> {
        Err(GatewayError::Unsupported(
            "the Razorpay checkout modal runs in the browser",
        ))
    }
}

#[async_trait]
impl SignatureVerifier for RazorpayClient {
    async fn verify(&self, confirmation: &PaymentConfirmation) -> Result<bool, GatewayError> {
        Ok(self.verify_signature(confirmation))
    }
}
