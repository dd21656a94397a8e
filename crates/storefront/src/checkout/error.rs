//! Checkout errors and the views they map to.

use nutriio_core::{GatewayOrderId, MoneyError, PaymentId};
use serde::Serialize;
use thiserror::Error;

use super::collaborators::{GatewayError, PersistenceError};
use super::request::ValidationErrors;

/// Errors that end a checkout attempt.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to pay for.
    #[error("Your cart is empty")]
    EmptyCart,

    /// Address or contact details are incomplete.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Backend call failed before any money moved.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Gateway call failed before any money moved.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Cart total cannot be expressed in paise.
    #[error("Invalid amount: {0}")]
    Amount(#[from] MoneyError),

    /// Gateway answered for a different order than the one opened.
    #[error("Payment reference mismatch: expected {expected}, got {actual}")]
    OrderMismatch {
        expected: GatewayOrderId,
        actual: GatewayOrderId,
    },

    /// Payment signature did not verify. The order is never confirmed.
    #[error("Payment signature rejected for {payment_id}")]
    SignatureRejected { payment_id: PaymentId },

    /// The signature could not be checked at all.
    #[error("Payment verification unavailable for {payment_id}: {source}")]
    VerificationUnavailable {
        payment_id: PaymentId,
        source: GatewayError,
    },

    /// Money was captured but the order could not be recorded.
    #[error("Payment {payment_id} captured but order not recorded: {source}")]
    PaidButUnrecorded {
        payment_id: PaymentId,
        source: PersistenceError,
    },
}

/// The screen the shopper sees after an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum CheckoutView {
    /// Stay on checkout with an inline message.
    Checkout { message: String },
    /// Order placed.
    Success,
    /// Payment did not go through; the cart is intact.
    Failure { message: String },
    /// Hand the shopper over to WhatsApp to book the order.
    WhatsApp { url: String },
    /// Something needs a human; quote the payment reference.
    SupportContact {
        message: String,
        payment_id: Option<PaymentId>,
    },
}

/// Shown when payment could not be started.
pub const PAYMENT_START_FAILED: &str = "Unable to initiate payment. Please try again.";

/// Shown when a paid order needs manual follow-up.
pub const CONTACT_SUPPORT: &str = "Please contact support for assistance.";

impl CheckoutError {
    /// The view the UI shows for this error.
    #[must_use]
    pub fn view(&self) -> CheckoutView {
        match self {
            Self::EmptyCart | Self::Validation(_) => CheckoutView::Checkout {
                message: self.to_string(),
            },
            Self::Persistence(_) | Self::Gateway(_) | Self::Amount(_) => CheckoutView::Failure {
                message: PAYMENT_START_FAILED.to_string(),
            },
            Self::OrderMismatch { .. } => CheckoutView::SupportContact {
                message: CONTACT_SUPPORT.to_string(),
                payment_id: None,
            },
            Self::SignatureRejected { payment_id }
            | Self::VerificationUnavailable { payment_id, .. }
            | Self::PaidButUnrecorded { payment_id, .. } => CheckoutView::SupportContact {
                message: CONTACT_SUPPORT.to_string(),
                payment_id: Some(payment_id.clone()),
            },
        }
    }

    /// Whether the gateway may have captured money.
    #[must_use]
    pub const fn money_may_have_moved(&self) -> bool {
        matches!(
            self,
            Self::OrderMismatch { .. }
                | Self::SignatureRejected { .. }
                | Self::VerificationUnavailable { .. }
                | Self::PaidButUnrecorded { .. }
        )
    }
}

impl From<ValidationErrors> for CheckoutError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::request::{CheckoutField, FieldProblem};

    #[test]
    fn test_views() {
        let validation = CheckoutError::Validation(ValidationErrors::single(
            CheckoutField::City,
            FieldProblem::Missing,
        ));
        assert_eq!(
            validation.view(),
            CheckoutView::Checkout {
                message: "Please fill in all required fields: City".to_string()
            }
        );

        let unavailable = CheckoutError::Persistence(PersistenceError::Unavailable(
            "connection refused".to_string(),
        ));
        assert!(matches!(unavailable.view(), CheckoutView::Failure { .. }));
        assert!(!unavailable.money_may_have_moved());

        let unrecorded = CheckoutError::PaidButUnrecorded {
            payment_id: PaymentId::new("pay_1"),
            source: PersistenceError::NotFound("orders".to_string()),
        };
        assert_eq!(
            unrecorded.view(),
            CheckoutView::SupportContact {
                message: CONTACT_SUPPORT.to_string(),
                payment_id: Some(PaymentId::new("pay_1")),
            }
        );
        assert!(unrecorded.money_may_have_moved());
    }
}
