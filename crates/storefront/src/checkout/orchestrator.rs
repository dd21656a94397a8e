//! Checkout state machine.
//!
//! One [`CheckoutOrchestrator::submit`] call drives one attempt:
//!
//! ```text
//! Idle -> Validating -> GatewayOpen -> OrderCreated -> Paid
//!              |              |
//!              |              +-> Failed
//!              +-> WhatsAppBooking
//! ```
//!
//! The order row is only written after the gateway reports success and the
//! signature verifies, and the cart is only cleared after the order is
//! confirmed.

use std::collections::BTreeSet;

use chrono::Utc;
use nutriio_core::{CurrencyCode, GatewayOrderId, OrderStatus, PaymentId, PaymentStatus, UserId};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use super::collaborators::{PaymentGateway, PersistenceError, SignatureVerifier, StorePersistence};
use super::error::{CheckoutError, CheckoutView};
use super::request::{
    CheckoutField, CheckoutRequest, FieldProblem, ValidationErrors, resolve_saved_address,
    validate_manual,
};
use super::whatsapp::WhatsAppBooking;
use crate::cart::{CartLineItem, CartSnapshot, CartStorage, CartStore};
use crate::models::{
    DEFAULT_THEME_COLOR, Delivery, GatewayOrderRequest, GatewayOutcome, GatewaySession,
    NewOrder, NewOrderItem, OrderRecord, OrderStatusUpdate, Prefill,
};

/// Default payment description shown in the hosted checkout.
pub const DEFAULT_DESCRIPTION: &str = "Healthy Food Products";

/// Where the current attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Idle,
    Validating,
    GatewayOpen,
    OrderCreated,
    Paid,
    Failed,
    WhatsAppBooking,
}

/// Merchant-side checkout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Public gateway key id forwarded to the hosted checkout.
    pub key_id: String,
    pub merchant_name: String,
    pub description: String,
    pub theme_color: String,
    pub currency: CurrencyCode,
    /// Number that receives WhatsApp bookings.
    pub whatsapp_number: String,
    /// Postal codes the courier serves. Empty means everywhere.
    pub serviceable_pincodes: BTreeSet<String>,
}

impl CheckoutSettings {
    /// Settings with brand defaults for everything but the key id.
    #[must_use]
    pub fn new(key_id: impl Into<String>, whatsapp_number: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            merchant_name: "Nutriio".to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            theme_color: DEFAULT_THEME_COLOR.to_string(),
            currency: CurrencyCode::INR,
            whatsapp_number: whatsapp_number.into(),
            serviceable_pincodes: BTreeSet::new(),
        }
    }

    /// Whether the courier delivers to `postal_code`.
    #[must_use]
    pub fn is_serviceable(&self, postal_code: &str) -> bool {
        self.serviceable_pincodes.is_empty()
            || self.serviceable_pincodes.contains(postal_code.trim())
    }
}

/// A confirmed, paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaidOrder {
    pub order: OrderRecord,
    pub payment_id: PaymentId,
    pub amount_paise: i64,
}

/// Why a payment did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailedPayment {
    /// The gateway declined or errored.
    Declined { reason: String },
    /// The shopper closed the checkout.
    Dismissed,
}

/// How an attempt ended when it did not error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    Paid(PaidOrder),
    Failed(FailedPayment),
    WhatsAppBooking(WhatsAppBooking),
}

impl CheckoutOutcome {
    /// The view the UI shows for this outcome.
    #[must_use]
    pub fn view(&self) -> CheckoutView {
        match self {
            Self::Paid(_) => CheckoutView::Success,
            Self::Failed(FailedPayment::Declined { .. }) => CheckoutView::Failure {
                message: "Payment failed. Your cart has not been changed.".to_string(),
            },
            Self::Failed(FailedPayment::Dismissed) => CheckoutView::Failure {
                message: "Payment cancelled. Your cart has not been changed.".to_string(),
            },
            Self::WhatsAppBooking(booking) => CheckoutView::WhatsApp {
                url: booking.url.clone(),
            },
        }
    }
}

/// Drives checkout attempts against the persistence backend and gateway.
#[derive(Debug)]
pub struct CheckoutOrchestrator<P, G, V> {
    persistence: P,
    gateway: G,
    verifier: V,
    settings: CheckoutSettings,
    state: CheckoutState,
}

impl<P, G, V> CheckoutOrchestrator<P, G, V>
where
    P: StorePersistence,
    G: PaymentGateway,
    V: SignatureVerifier,
{
    /// Create an idle orchestrator.
    pub const fn new(persistence: P, gateway: G, verifier: V, settings: CheckoutSettings) -> Self {
        Self {
            persistence,
            gateway,
            verifier,
            settings,
            state: CheckoutState::Idle,
        }
    }

    /// State reached by the most recent attempt.
    #[must_use]
    pub const fn state(&self) -> CheckoutState {
        self.state
    }

    #[must_use]
    pub const fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    #[must_use]
    pub const fn persistence(&self) -> &P {
        &self.persistence
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Run one checkout attempt for `cart`.
    ///
    /// The cart is cleared only when the outcome is
    /// [`CheckoutOutcome::Paid`].
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] for validation failures, backend or gateway
    /// failures before payment, signature problems, and a captured payment
    /// whose order could not be recorded.
    #[instrument(skip_all, fields(user_id = ?request.user_id))]
    pub async fn submit<S: CartStorage>(
        &mut self,
        cart: &mut CartStore<S>,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        self.state = CheckoutState::Validating;

        let result = self.run(cart, request).await;
        match &result {
            Ok(_) | Err(CheckoutError::EmptyCart | CheckoutError::Validation(_)) => {}
            Err(_) => self.state = CheckoutState::Failed,
        }
        result
    }

    async fn run<S: CartStorage>(
        &mut self,
        cart: &mut CartStore<S>,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let delivery = self.resolve_delivery(request).await?;
        let items = cart.items().to_vec();
        let totals = cart.snapshot();

        if !self.settings.is_serviceable(&delivery.address.postal_code) {
            info!(
                postal_code = %delivery.address.postal_code,
                "Postal code not serviceable, routing to WhatsApp"
            );
            let booking = WhatsAppBooking::compose(
                &self.settings.whatsapp_number,
                &self.settings.merchant_name,
                &delivery,
                &items,
                &totals,
            );
            self.state = CheckoutState::WhatsAppBooking;
            return Ok(CheckoutOutcome::WhatsAppBooking(booking));
        }

        let amount_paise = totals.payable_paise()?;
        let gateway_order = self
            .gateway
            .create_order(&GatewayOrderRequest {
                amount: amount_paise,
                currency: self.settings.currency,
                receipt: format!("receipt_{}", Utc::now().timestamp_millis()),
            })
            .await?;

        self.state = CheckoutState::GatewayOpen;
        info!(gateway_order_id = %gateway_order.id, amount_paise, "Gateway session opened");

        let session = self.session_for(&gateway_order.id, amount_paise, &delivery);
        let confirmation = match self.gateway.open_session(&session).await? {
            GatewayOutcome::Succeeded(confirmation) => confirmation,
            GatewayOutcome::Failed { reason } => {
                warn!(gateway_order_id = %gateway_order.id, %reason, "Payment failed");
                self.state = CheckoutState::Failed;
                return Ok(CheckoutOutcome::Failed(FailedPayment::Declined { reason }));
            }
            GatewayOutcome::Dismissed => {
                info!(gateway_order_id = %gateway_order.id, "Payment dismissed");
                self.state = CheckoutState::Failed;
                return Ok(CheckoutOutcome::Failed(FailedPayment::Dismissed));
            }
        };

        if confirmation.order_id != gateway_order.id {
            return Err(CheckoutError::OrderMismatch {
                expected: gateway_order.id,
                actual: confirmation.order_id,
            });
        }

        let payment_id = confirmation.payment_id.clone();
        match self.verifier.verify(&confirmation).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(%payment_id, "Payment signature rejected");
                return Err(CheckoutError::SignatureRejected { payment_id });
            }
            Err(source) => {
                return Err(CheckoutError::VerificationUnavailable { payment_id, source });
            }
        }

        let order = match self
            .record_order(
                request.user_id.as_ref(),
                &delivery,
                &items,
                &totals,
                &gateway_order.id,
                &payment_id,
            )
            .await
        {
            Ok(order) => order,
            Err(source) => {
                error!(
                    %payment_id,
                    gateway_order_id = %gateway_order.id,
                    amount_paise,
                    error = %source,
                    "Payment captured but order could not be recorded"
                );
                return Err(CheckoutError::PaidButUnrecorded { payment_id, source });
            }
        };

        cart.clear();
        self.state = CheckoutState::Paid;
        info!(order_number = %order.order_number, %payment_id, "Order paid");

        Ok(CheckoutOutcome::Paid(PaidOrder {
            order,
            payment_id,
            amount_paise,
        }))
    }

    async fn resolve_delivery(&self, request: &CheckoutRequest) -> Result<Delivery, CheckoutError> {
        let Some(address_id) = &request.selected_address_id else {
            return Ok(validate_manual(&request.form)?);
        };

        let Some(user_id) = &request.user_id else {
            return Err(ValidationErrors::single(
                CheckoutField::SavedAddress,
                FieldProblem::Invalid("sign in to use a saved address".to_string()),
            )
            .into());
        };

        let addresses = self.persistence.list_addresses(user_id).await?;
        let saved = addresses
            .iter()
            .find(|a| &a.id == address_id)
            .ok_or_else(|| {
                ValidationErrors::single(
                    CheckoutField::SavedAddress,
                    FieldProblem::Invalid("address is no longer available".to_string()),
                )
            })?;

        let profile = self.persistence.profile(user_id).await?;
        Ok(resolve_saved_address(saved, &request.form, profile.as_ref())?)
    }

    fn session_for(
        &self,
        order_ref: &GatewayOrderId,
        amount: i64,
        delivery: &Delivery,
    ) -> GatewaySession {
        let contact = &delivery.contact;
        GatewaySession {
            key_id: self.settings.key_id.clone(),
            amount,
            currency: self.settings.currency,
            order_ref: order_ref.clone(),
            merchant_name: self.settings.merchant_name.clone(),
            description: self.settings.description.clone(),
            prefill: Prefill {
                name: contact.name.clone(),
                email: contact.email.as_str().to_string(),
                contact: contact.phone.as_str().to_string(),
            },
            theme_color: self.settings.theme_color.clone(),
        }
    }

    #[instrument(skip_all, fields(%payment_id))]
    async fn record_order(
        &mut self,
        user_id: Option<&UserId>,
        delivery: &Delivery,
        items: &[CartLineItem],
        totals: &CartSnapshot,
        gateway_order_id: &GatewayOrderId,
        payment_id: &PaymentId,
    ) -> Result<OrderRecord, PersistenceError> {
        let order_number = self.persistence.generate_order_number().await?;
        let contact = &delivery.contact;

        let header = NewOrder {
            order_number,
            user_id: user_id.cloned(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: totals.grand_total,
            shipping_cost: totals.shipping_cost,
            shipping_address: delivery.address.clone(),
            customer_name: contact.name.clone(),
            customer_email: contact.email.as_str().to_string(),
            customer_phone: contact.phone.as_str().to_string(),
            razorpay_order_id: Some(gateway_order_id.clone()),
        };
        let created = self.persistence.insert_order(&header).await?;
        self.state = CheckoutState::OrderCreated;

        let lines: Vec<NewOrderItem> = items
            .iter()
            .map(|line| NewOrderItem::from_cart_line(&created.id, line))
            .collect();
        self.persistence.insert_order_items(&lines).await?;

        self.persistence
            .update_order_status(&created.id, &OrderStatusUpdate::paid(payment_id.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pincode_set_serves_everywhere() {
        let mut settings = CheckoutSettings::new("rzp_test_key", "919000012345");
        assert!(settings.is_serviceable("194101"));

        settings.serviceable_pincodes = ["560001".to_string()].into_iter().collect();
        assert!(settings.is_serviceable(" 560001"));
        assert!(!settings.is_serviceable("194101"));
    }

    #[test]
    fn test_outcome_views() {
        assert_eq!(
            CheckoutOutcome::Failed(FailedPayment::Dismissed).view(),
            CheckoutView::Failure {
                message: "Payment cancelled. Your cart has not been changed.".to_string()
            }
        );
    }
}
