//! WhatsApp order booking for postal codes the courier does not serve.

use nutriio_core::format_rupees;
use serde::Serialize;

use crate::cart::{CartLineItem, CartSnapshot};
use crate::models::Delivery;

/// A prefilled WhatsApp conversation that books the order by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhatsAppBooking {
    /// Destination number, digits only.
    pub destination: String,
    /// Plain-text message body.
    pub message: String,
    /// `https://wa.me/<number>?text=<message>` link.
    pub url: String,
}

impl WhatsAppBooking {
    /// Compose the booking message for a cart and delivery.
    #[must_use]
    pub fn compose(
        number: &str,
        merchant_name: &str,
        delivery: &Delivery,
        items: &[CartLineItem],
        totals: &CartSnapshot,
    ) -> Self {
        let destination: String = number.chars().filter(char::is_ascii_digit).collect();
        let contact = &delivery.contact;

        let mut lines = vec![
            format!("Hi {merchant_name}, I'd like to place an order."),
            String::new(),
            format!("Name: {}", contact.name),
            format!("Phone: {}", contact.phone),
            format!("Email: {}", contact.email),
            format!("Address: {}", delivery.address.one_line()),
            String::new(),
            "Items:".to_string(),
        ];
        lines.extend(items.iter().map(|line| {
            format!(
                "- {} x {} = {}",
                line.name,
                line.quantity,
                format_rupees(line.line_total())
            )
        }));
        lines.extend([
            String::new(),
            format!("Subtotal: {}", format_rupees(totals.total_price)),
            format!("Shipping: {}", format_rupees(totals.shipping_cost)),
            format!("Total: {}", format_rupees(totals.grand_total)),
        ]);
        let message = lines.join("\n");

        let url = format!(
            "https://wa.me/{destination}?text={}",
            urlencoding::encode(&message)
        );

        Self {
            destination,
            message,
            url,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{CartStore, MemoryStorage, NewCartItem};
    use crate::checkout::request::{CheckoutForm, validate_manual};
    use nutriio_core::ProductId;
    use rust_decimal::Decimal;

    #[test]
    fn test_message_itemizes_cart_and_totals() {
        let mut cart = CartStore::open(MemoryStorage::new());
        for _ in 0..2 {
            cart.add_item(NewCartItem {
                id: ProductId::new("ragi-cookies"),
                name: "Ragi Cookies".to_string(),
                price: Decimal::from(210),
                image: String::new(),
                weight: Some("250".to_string()),
            });
        }
        let delivery = validate_manual(&CheckoutForm {
            full_name: "Asha Rao".to_string(),
            email: "asha@example.in".to_string(),
            phone: "9876543210".to_string(),
            address_line_1: "12 MG Road".to_string(),
            city: "Leh".to_string(),
            postal_code: "194101".to_string(),
            ..CheckoutForm::default()
        })
        .unwrap();

        let booking = WhatsAppBooking::compose(
            "+91 90000 12345",
            "Nutriio",
            &delivery,
            cart.items(),
            &cart.snapshot(),
        );

        assert_eq!(booking.destination, "919000012345");
        assert!(booking.message.contains("- Ragi Cookies x 2 = ₹420"));
        assert!(booking.message.contains("Shipping: ₹80"));
        assert!(booking.message.ends_with("Total: ₹500"));
        assert!(booking.url.starts_with("https://wa.me/919000012345?text=Hi%20Nutriio"));
        assert!(!booking.url.contains(' '));
    }
}
