//! Razorpay integration.
//!
//! - [`RazorpayClient`] creates gateway orders and verifies signatures
//! - [`HostedGateway`] waits for the browser modal's result
//! - [`signature`] holds the HMAC check shared by both

mod hosted;
mod razorpay;
pub mod signature;

pub use hosted::{AttemptReport, HostedGateway, SessionError, SessionRegistry};
pub use razorpay::RazorpayClient;
pub use signature::{expected_signature, verify_payment_signature};
