//! Shopping cart engine.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the line items and recomputes every total on read
//! - [`CartStorage`] is the durable key-value seam ([`MemoryStorage`], [`FileStorage`])
//! - [`shipping`] maps total weight to a flat fee
//!
//! # Example
//!
//! ```rust
//! use nutriio_core::ProductId;
//! use nutriio_storefront::cart::{CartStore, MemoryStorage, NewCartItem};
//! use rust_decimal::Decimal;
//!
//! let mut cart = CartStore::open(MemoryStorage::new());
//! cart.add_item(NewCartItem {
//!     id: ProductId::new("jaggery-peanut-bar"),
//!     name: "Jaggery Peanut Bar".to_string(),
//!     price: Decimal::from(210),
//!     image: "/images/bar.jpg".to_string(),
//!     weight: Some("250".to_string()),
//! });
//!
//! assert_eq!(cart.total_items(), 1);
//! assert_eq!(cart.shipping_cost(), Decimal::from(80));
//! ```

mod item;
pub mod shipping;
mod storage;
mod store;

pub use item::{CartLineItem, NewCartItem, parse_grams};
pub use shipping::{SHIPPING_TIERS, ShippingTier, shipping_cost_for_weight, tier_for_weight};
pub use storage::{CartStorage, CartStorageError, FileStorage, MemoryStorage};
pub use store::{CartSnapshot, CartStore};

/// Storage key holding the serialized line-item array.
pub const CART_STORAGE_KEY: &str = "nutriio-cart";
