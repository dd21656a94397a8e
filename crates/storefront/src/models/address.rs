//! Address and profile domain types.
//!
//! `SavedAddress` and `Profile` mirror the backend's `addresses` and
//! `profiles` rows. `ShippingAddress` is the resolved delivery address a
//! checkout attempt ships to, whichever source it came from.

use nutriio_core::{AddressId, AddressKind, Email, Phone, UserId};
use serde::{Deserialize, Serialize};

/// Country used when a form leaves it blank.
pub const DEFAULT_COUNTRY: &str = "India";

/// An address saved in the shopper's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    pub user_id: UserId,
    #[serde(rename = "type", default)]
    pub kind: AddressKind,
    pub full_name: String,
    pub phone_number: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Profile defaults used to fill contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// The address an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Single-line rendering, e.g. for messages.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts: Vec<&str> = vec![self.address_line_1.as_str()];
        if let Some(line_2) = self.address_line_2.as_deref().filter(|l| !l.is_empty()) {
            parts.push(line_2);
        }
        parts.push(self.city.as_str());
        if !self.state.is_empty() {
            parts.push(self.state.as_str());
        }
        format!("{} - {}, {}", parts.join(", "), self.postal_code, self.country)
    }
}

impl From<&SavedAddress> for ShippingAddress {
    fn from(saved: &SavedAddress) -> Self {
        Self {
            full_name: saved.full_name.clone(),
            phone: saved.phone_number.clone(),
            address_line_1: saved.address_line_1.clone(),
            address_line_2: saved.address_line_2.clone(),
            city: saved.city.clone(),
            state: saved.state.clone(),
            postal_code: saved.postal_code.trim().to_string(),
            country: saved.country.clone(),
        }
    }
}

/// Validated contact details for the person paying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: Email,
    pub phone: Phone,
}

/// Where and to whom a checkout attempt delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub address: ShippingAddress,
    pub contact: CustomerContact,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_address_from_backend_row() {
        let row = serde_json::json!({
            "id": "addr-1",
            "user_id": "user-1",
            "type": "work",
            "full_name": "Asha Rao",
            "phone_number": "9876543210",
            "address_line_1": "12 MG Road",
            "address_line_2": null,
            "city": "Bengaluru",
            "state": "Karnataka",
            "postal_code": "560001",
            "is_default": true,
            "created_at": "2024-06-01T10:00:00Z"
        });
        let address: SavedAddress = serde_json::from_value(row).unwrap();
        assert_eq!(address.kind, AddressKind::Work);
        assert_eq!(address.country, "India");
        assert!(address.is_default);
    }

    #[test]
    fn test_one_line_skips_empty_parts() {
        let address = ShippingAddress {
            full_name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            address_line_1: "12 MG Road".to_string(),
            address_line_2: Some(String::new()),
            city: "Bengaluru".to_string(),
            state: String::new(),
            postal_code: "560001".to_string(),
            country: "India".to_string(),
        };
        assert_eq!(address.one_line(), "12 MG Road, Bengaluru - 560001, India");
    }
}
