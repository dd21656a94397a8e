//! Cart line items.

use nutriio_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Product details captured when a shopper adds an item.
///
/// The cart copies these at add time and never re-fetches them, so a later
/// catalog price change does not re-price an existing cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    /// Grams per unit, string-encoded as the catalog stores it.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
}

/// One product entry in the cart.
///
/// Serialized field names match the payload browsers already hold under the
/// cart storage key, so carts persisted by older clients rehydrate as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    pub quantity: u32,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
}

impl CartLineItem {
    pub(crate) fn from_new(item: NewCartItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
            image: item.image,
            quantity: 1,
            weight: item.weight,
        }
    }

    /// Unit weight in grams, 0 when unknown.
    #[must_use]
    pub fn unit_weight_grams(&self) -> u64 {
        self.weight.as_deref().map_or(0, parse_grams)
    }

    /// `price * quantity`, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    /// `unit_weight * quantity`, saturating.
    #[must_use]
    pub fn line_weight_grams(&self) -> u64 {
        self.unit_weight_grams()
            .saturating_mul(u64::from(self.quantity))
    }
}

/// Parse a string-encoded gram count the way browsers' `parseInt` reads it.
///
/// Leading whitespace and a `+` sign are skipped, then the leading run of
/// ASCII digits is read (`"250g"` is 250). Anything without leading digits,
/// including negative values, counts as 0.
#[must_use]
pub fn parse_grams(raw: &str) -> u64 {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    unsigned
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_u64, |acc, digit| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(digit - b'0'))
        })
}

/// Accept weights persisted either as `"250"` or `250`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Whole(u64),
        Fractional(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Whole(n)) => Some(n.to_string()),
        Some(Raw::Fractional(n)) => Some(n.to_string()),
        None => None,
    })
}
