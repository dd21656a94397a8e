//! Domain models for the storefront.
//!
//! These types are the shapes exchanged with the persistence backend and the
//! payment gateway. Row types deserialize leniently; extra columns are ignored.

pub mod address;
pub mod order;
pub mod payment;

pub use address::{CustomerContact, DEFAULT_COUNTRY, Delivery, Profile, SavedAddress, ShippingAddress};
pub use order::{NewOrder, NewOrderItem, OrderRecord, OrderStatusUpdate};
pub use payment::{
    DEFAULT_THEME_COLOR, GatewayOrder, GatewayOrderRequest, GatewayOutcome, GatewaySession,
    PaymentConfirmation, Prefill,
};
