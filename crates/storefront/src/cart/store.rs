//! The cart store: line items, derived totals and persistence.

use nutriio_core::{MoneyError, ProductId, to_minor_units};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use super::item::{CartLineItem, NewCartItem};
use super::shipping::shipping_cost_for_weight;
use super::storage::CartStorage;
use super::CART_STORAGE_KEY;

/// Totals derived from the current line items. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub total_items: u64,
    pub total_price: Decimal,
    pub total_weight_grams: u64,
    pub shipping_cost: Decimal,
    pub grand_total: Decimal,
}

impl CartSnapshot {
    /// Compute totals for a set of line items.
    ///
    /// Money sums saturate at the `Decimal` bounds; a saturated total fails
    /// [`CartSnapshot::payable_paise`].
    #[must_use]
    pub fn of(items: &[CartLineItem]) -> Self {
        let total_items = items
            .iter()
            .fold(0_u64, |acc, i| acc.saturating_add(u64::from(i.quantity)));
        let total_price = items
            .iter()
            .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.line_total()));
        let total_weight_grams = items
            .iter()
            .fold(0_u64, |acc, i| acc.saturating_add(i.line_weight_grams()));
        let shipping_cost = shipping_cost_for_weight(total_weight_grams);

        Self {
            total_items,
            total_price,
            total_weight_grams,
            shipping_cost,
            grand_total: total_price.saturating_add(shipping_cost),
        }
    }

    /// Amount payable through the gateway, in paise.
    ///
    /// # Errors
    ///
    /// Returns an error if the total cannot be expressed in `i64` paise.
    pub fn payable_paise(&self) -> Result<i64, MoneyError> {
        to_minor_units(self.grand_total)
    }
}

/// Shopping cart owned by one shopper session.
///
/// Create it once with [`CartStore::open`] and pass it by reference to
/// whatever needs it. Every mutation rewrites the full line-item list under
/// [`CART_STORAGE_KEY`]; a failed write is logged and the in-memory cart
/// stays authoritative.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    items: Vec<CartLineItem>,
}

impl<S: CartStorage> CartStore<S> {
    /// Open the cart persisted in `storage`.
    ///
    /// A missing key is an empty cart. An unreadable or corrupt payload is
    /// logged and also treated as empty.
    pub fn open(storage: S) -> Self {
        let items = match storage.load(CART_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartLineItem>>(&raw) {
                Ok(items) => normalize_items(items),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted cart");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted cart");
                Vec::new()
            }
        };

        debug!(lines = items.len(), "Cart rehydrated");
        Self { storage, items }
    }

    /// Build a cart from line items supplied by a client, enforcing the cart
    /// invariants (one line per id, no zero quantities), and persist it.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] when the cart's grand total cannot be charged
    /// in paise. Nothing is persisted in that case.
    pub fn restore(storage: S, items: Vec<CartLineItem>) -> Result<Self, MoneyError> {
        let items = normalize_items(items);
        CartSnapshot::of(&items).payable_paise()?;

        let store = Self { storage, items };
        store.persist();
        Ok(store)
    }

    /// Line items in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// `true` when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The storage backend.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Add one unit of a product.
    ///
    /// Repeat adds bump the quantity and keep the metadata captured by the
    /// first add.
    pub fn add_item(&mut self, item: NewCartItem) {
        if let Some(line) = self.line_mut(&item.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.items.push(CartLineItem::from_new(item));
        }
        self.persist();
    }

    /// Remove a product's line. Absent ids are ignored.
    pub fn remove_item(&mut self, id: &ProductId) {
        let before = self.items.len();
        self.items.retain(|line| &line.id != id);
        if self.items.len() != before {
            self.persist();
        }
    }

    /// Set a line's quantity. Zero removes the line; absent ids are ignored.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(id);
            return;
        }

        if let Some(line) = self.line_mut(id) {
            if line.quantity == quantity {
                return;
            }
            line.quantity = quantity;
            self.persist();
        }
    }

    /// Quantity of a product in the cart, 0 when absent.
    #[must_use]
    pub fn item_quantity(&self, id: &ProductId) -> u32 {
        self.items
            .iter()
            .find(|line| &line.id == id)
            .map_or(0, |line| line.quantity)
    }

    /// Empty the cart. Only called once a payment is confirmed.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.snapshot().total_items
    }

    /// Sum of `price * quantity`.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.snapshot().total_price
    }

    /// Sum of `weight * quantity` in grams.
    #[must_use]
    pub fn total_weight_grams(&self) -> u64 {
        self.snapshot().total_weight_grams
    }

    /// Shipping fee for the current weight.
    #[must_use]
    pub fn shipping_cost(&self) -> Decimal {
        self.snapshot().shipping_cost
    }

    /// Items plus shipping.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.snapshot().grand_total
    }

    /// All derived totals, recomputed from the current lines.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::of(&self.items)
    }

    fn line_mut(&mut self, id: &ProductId) -> Option<&mut CartLineItem> {
        self.items.iter_mut().find(|line| &line.id == id)
    }

    fn persist(&self) {
        let payload = match serde_json::to_string(&self.items) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cart");
                return;
            }
        };

        if let Err(e) = self.storage.store(CART_STORAGE_KEY, &payload) {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// Merge duplicate ids (first metadata wins, quantities add up) and drop
/// zero-quantity lines.
fn normalize_items(items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(items.len());
    for item in items.into_iter().filter(|i| i.quantity > 0) {
        if let Some(existing) = merged.iter_mut().find(|m| m.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            merged.push(item);
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::storage::MemoryStorage;

    fn product(id: &str, price: i64, weight: Option<&str>) -> NewCartItem {
        NewCartItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            image: format!("/images/{id}.jpg"),
            weight: weight.map(String::from),
        }
    }

    #[test]
    fn test_repeat_adds_dedupe_with_first_metadata() {
        let mut cart = CartStore::open(MemoryStorage::new());
        cart.add_item(product("a", 210, Some("250")));
        for _ in 0..4 {
            let mut changed = product("a", 999, Some("1000"));
            changed.name = "Renamed".to_string();
            cart.add_item(changed);
        }

        assert_eq!(cart.items().len(), 1);
        let line = &cart.items()[0];
        assert_eq!(line.quantity, 5);
        assert_eq!(line.name, "Product a");
        assert_eq!(line.price, Decimal::from(210));
        assert_eq!(line.weight.as_deref(), Some("250"));
    }

    #[test]
    fn test_reference_scenario_totals() {
        let mut cart = CartStore::open(MemoryStorage::new());
        cart.add_item(product("a", 210, Some("250")));
        cart.add_item(product("a", 210, Some("250")));
        cart.add_item(product("b", 140, Some("500")));

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.total_items, 3);
        assert_eq!(snapshot.total_price, Decimal::from(560));
        assert_eq!(snapshot.total_weight_grams, 1_000);
        assert_eq!(snapshot.shipping_cost, Decimal::from(80));
        assert_eq!(snapshot.grand_total, Decimal::from(640));
        assert_eq!(snapshot.payable_paise().unwrap(), 64_000);
    }

    #[test]
    fn test_unknown_weights_ship_at_lowest_tier() {
        let mut cart = CartStore::open(MemoryStorage::new());
        cart.add_item(product("a", 50, None));
        assert_eq!(cart.total_weight_grams(), 0);
        assert_eq!(cart.shipping_cost(), Decimal::from(80));
    }

    #[test]
    fn test_weight_drives_shipping_tier() {
        let mut cart = CartStore::open(MemoryStorage::new());
        cart.add_item(product("a", 100, Some("800")));
        cart.update_quantity(&ProductId::new("a"), 4);
        assert_eq!(cart.total_weight_grams(), 3_200);
        assert_eq!(cart.shipping_cost(), Decimal::from(110));

        cart.update_quantity(&ProductId::new("a"), 20);
        assert_eq!(cart.total_weight_grams(), 16_000);
        assert_eq!(cart.shipping_cost(), Decimal::from(140));
    }

    #[test]
    fn test_update_to_zero_equals_remove() {
        let mut via_update = CartStore::open(MemoryStorage::new());
        let mut via_remove = CartStore::open(MemoryStorage::new());
        for cart in [&mut via_update, &mut via_remove] {
            cart.add_item(product("a", 10, None));
            cart.add_item(product("b", 20, None));
        }

        via_update.update_quantity(&ProductId::new("a"), 0);
        via_remove.remove_item(&ProductId::new("a"));

        assert_eq!(via_update.items(), via_remove.items());
        assert_eq!(via_update.item_quantity(&ProductId::new("a")), 0);
    }

    #[test]
    fn test_absent_ids_are_noops() {
        let storage = MemoryStorage::new();
        let mut cart = CartStore::open(storage.clone());
        cart.add_item(product("a", 10, None));
        let persisted = storage.load(CART_STORAGE_KEY).unwrap();

        cart.remove_item(&ProductId::new("ghost"));
        cart.update_quantity(&ProductId::new("ghost"), 3);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(storage.load(CART_STORAGE_KEY).unwrap(), persisted);
        assert_eq!(cart.item_quantity(&ProductId::new("ghost")), 0);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let storage = MemoryStorage::new();
        let mut cart = CartStore::open(storage.clone());
        cart.add_item(product("a", 10, Some("100")));
        cart.add_item(product("b", 20, None));
        cart.update_quantity(&ProductId::new("b"), 3);

        let reopened = CartStore::open(storage.clone());
        assert_eq!(reopened.items(), cart.items());

        cart.clear();
        let reopened = CartStore::open(storage);
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_rehydrated_totals_unchanged() {
        let storage = MemoryStorage::new();
        let mut cart = CartStore::open(storage.clone());
        cart.add_item(product("a", 210, Some("250")));
        cart.add_item(product("a", 210, Some("250")));
        cart.add_item(product("b", 140, Some("500")));

        let reopened = CartStore::open(storage);
        assert_eq!(reopened.snapshot(), cart.snapshot());
    }

    #[test]
    fn test_corrupt_payload_opens_empty() {
        let storage = MemoryStorage::new();
        storage.store(CART_STORAGE_KEY, "{not json").unwrap();
        let cart = CartStore::open(storage);
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_rehydration_enforces_invariants() {
        let storage = MemoryStorage::new();
        storage
            .store(
                CART_STORAGE_KEY,
                r#"[
                    {"id":"a","name":"First","price":10,"image":"","quantity":2},
                    {"id":"b","name":"Zero","price":5,"image":"","quantity":0},
                    {"id":"a","name":"Second","price":99,"image":"","quantity":1}
                ]"#,
            )
            .unwrap();

        let cart = CartStore::open(storage);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].name, "First");
        assert_eq!(cart.item_quantity(&ProductId::new("a")), 3);
        assert_eq!(cart.item_quantity(&ProductId::new("b")), 0);
    }

    #[test]
    fn test_restore_persists_normalized_items() {
        let storage = MemoryStorage::new();
        let items = vec![
            CartLineItem::from_new(product("a", 10, None)),
            CartLineItem::from_new(product("a", 10, None)),
        ];
        let cart = CartStore::restore(storage.clone(), items).unwrap();
        assert_eq!(cart.item_quantity(&ProductId::new("a")), 2);
        assert_eq!(CartStore::open(storage).items(), cart.items());
    }

    #[test]
    fn test_restore_rejects_unpayable_totals() {
        let storage = MemoryStorage::new();
        let mut line = CartLineItem::from_new(product("a", 1, None));
        line.price = Decimal::MAX;
        line.quantity = 2;

        let err = CartStore::restore(storage.clone(), vec![line]).unwrap_err();

        assert!(matches!(err, MoneyError::OutOfRange(_)));
        assert_eq!(storage.load(CART_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_oversized_quantities_do_not_overflow() {
        let mut cart = CartStore::open(MemoryStorage::new());
        cart.add_item(product("a", 210, Some("250")));
        cart.add_item(product("b", 140, Some("500")));
        cart.update_quantity(&ProductId::new("a"), u32::MAX);
        cart.update_quantity(&ProductId::new("b"), u32::MAX);

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.total_items, 2 * u64::from(u32::MAX));
        assert!(snapshot.payable_paise().is_ok());
    }
}
