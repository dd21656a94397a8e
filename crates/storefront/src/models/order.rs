//! Order domain types.
//!
//! The backend owns orders; these are the request and response shapes the
//! checkout writes and reads through the persistence collaborator.

use nutriio_core::{
    GatewayOrderId, OrderId, OrderNumber, OrderStatus, PaymentId, PaymentStatus, ProductId,
    UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartLineItem;
use crate::models::address::ShippingAddress;

/// Order header to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Items plus shipping, in rupees.
    pub total_amount: Decimal,
    pub shipping_cost: Decimal,
    pub shipping_address: ShippingAddress,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub razorpay_order_id: Option<GatewayOrderId>,
}

/// Order header as returned by the backend after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_id: Option<PaymentId>,
}

/// One order line to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl NewOrderItem {
    /// Order line for a cart line, priced as captured in the cart.
    #[must_use]
    pub fn from_cart_line(order_id: &OrderId, line: &CartLineItem) -> Self {
        Self {
            order_id: order_id.clone(),
            product_id: line.id.clone(),
            quantity: line.quantity,
            unit_price: line.price,
            total_price: line.line_total(),
        }
    }
}

/// Status transition applied to an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
}

impl OrderStatusUpdate {
    /// The transition applied after a verified payment.
    #[must_use]
    pub const fn paid(payment_id: PaymentId) -> Self {
        Self {
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            payment_id: Some(payment_id),
        }
    }
}
