//! Payment gateway wire types.

use nutriio_core::{CurrencyCode, GatewayOrderId, PaymentId};
use serde::{Deserialize, Serialize};

/// Brand accent shown in the hosted checkout.
pub const DEFAULT_THEME_COLOR: &str = "#ea580c";

/// Request to create a gateway order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayOrderRequest {
    /// Amount in paise.
    pub amount: i64,
    pub currency: CurrencyCode,
    pub receipt: String,
}

/// A gateway order as returned by Razorpay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: GatewayOrderId,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Contact details pre-filled in the hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Everything the hosted checkout needs to take a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewaySession {
    /// Public key id; never the secret.
    pub key_id: String,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub order_ref: GatewayOrderId,
    pub merchant_name: String,
    pub description: String,
    pub prefill: Prefill,
    pub theme_color: String,
}

/// Success payload handed back by the hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(rename = "razorpay_payment_id")]
    pub payment_id: PaymentId,
    #[serde(rename = "razorpay_order_id")]
    pub order_id: GatewayOrderId,
    #[serde(rename = "razorpay_signature")]
    pub signature: String,
}

/// How a gateway session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Payment captured; still needs signature verification.
    Succeeded(PaymentConfirmation),
    /// The gateway reported a failed payment.
    Failed { reason: String },
    /// The shopper closed the checkout without paying.
    Dismissed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_uses_gateway_field_names() {
        let confirmation: PaymentConfirmation = serde_json::from_value(serde_json::json!({
            "razorpay_payment_id": "pay_29QQoUBi66xm2f",
            "razorpay_order_id": "order_9A33XWu170gUtm",
            "razorpay_signature": "deadbeef"
        }))
        .unwrap();
        assert_eq!(confirmation.payment_id.as_str(), "pay_29QQoUBi66xm2f");
        assert_eq!(confirmation.order_id.as_str(), "order_9A33XWu170gUtm");
    }

    #[test]
    fn test_gateway_order_tolerates_extra_fields() {
        let order: GatewayOrder = serde_json::from_value(serde_json::json!({
            "id": "order_9A33XWu170gUtm",
            "entity": "order",
            "amount": 64000,
            "amount_paid": 0,
            "currency": "INR",
            "receipt": "receipt_1718000000000",
            "status": "created",
            "attempts": 0
        }))
        .unwrap();
        assert_eq!(order.amount, 64_000);
        assert_eq!(order.status.as_deref(), Some("created"));
    }
}
