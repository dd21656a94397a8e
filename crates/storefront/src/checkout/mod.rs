//! Checkout orchestration.
//!
//! [`CheckoutOrchestrator`] turns a cart and a delivery address into a paid
//! order. It validates the address, opens a gateway session, verifies the
//! payment signature, records the order and finally clears the cart.
//! Postal codes outside the serviceable set are handed to WhatsApp instead.

mod collaborators;
mod error;
mod orchestrator;
mod request;
mod whatsapp;

pub use collaborators::{GatewayError, PaymentGateway, PersistenceError, SignatureVerifier, StorePersistence};
pub use error::{CONTACT_SUPPORT, CheckoutError, CheckoutView, PAYMENT_START_FAILED};
pub use orchestrator::{
    CheckoutOrchestrator, CheckoutOutcome, CheckoutSettings, CheckoutState, DEFAULT_DESCRIPTION,
    FailedPayment, PaidOrder,
};
pub use request::{
    CheckoutField, CheckoutForm, CheckoutRequest, FieldProblem, ValidationErrors,
    resolve_saved_address, validate_manual,
};
pub use whatsapp::WhatsAppBooking;
