//! Shopping cart persisted through the local cache.
//!
//! The cart lives in one cache entry (24-hour lifetime) and survives page
//! loads. Execution is single-threaded per client context, so each
//! operation's read-modify-write is atomic from the caller's perspective;
//! two contexts (e.g. two tabs) can diverge until either reloads, and the
//! change broadcast is best-effort only.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use solstice_core::ProductId;

use crate::cache::Cache;
use crate::models::product::Product;

/// Cache key the cart is stored under.
const CART_KEY: &str = "cart";

/// Cart entry lifetime.
const CART_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Broadcast channel capacity for change notifications.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// A product in the cart with its quantity.
///
/// At most one item exists per product id, and quantity is always >= 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Shopping cart over the local cache.
///
/// Every mutating operation broadcasts a payload-free change notification;
/// interested parties (a header badge, another panel) subscribe rather than
/// being called directly.
pub struct Cart {
    cache: Cache,
    changed: broadcast::Sender<()>,
}

impl Cart {
    /// Create a cart backed by the given cache.
    #[must_use]
    pub fn new(cache: Cache) -> Self {
        let (changed, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { cache, changed }
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changed.subscribe()
    }

    /// Add a product to the cart.
    ///
    /// If an item for the product already exists its quantity is
    /// incremented by `quantity`; otherwise a new item is appended.
    /// Adding zero is a no-op (quantity never drops below 1).
    pub fn add(&self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }

        let mut items = self.items();
        if let Some(item) = items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity += quantity;
        } else {
            items.push(CartItem {
                product: product.clone(),
                quantity,
            });
        }
        self.save(&items);
    }

    /// Remove a product from the cart.
    ///
    /// Removing an absent product is a no-op, not an error.
    pub fn remove(&self, product_id: ProductId) {
        let mut items = self.items();
        items.retain(|i| i.product.id != product_id);
        self.save(&items);
    }

    /// Overwrite the quantity of an item.
    ///
    /// Quantities below 1 are rejected: the cart is left unchanged and no
    /// notification fires.
    pub fn set_quantity(&self, product_id: ProductId, quantity: u32) {
        if quantity < 1 {
            return;
        }

        let mut items = self.items();
        if let Some(item) = items.iter_mut().find(|i| i.product.id == product_id) {
            item.quantity = quantity;
        }
        self.save(&items);
    }

    /// Empty the cart.
    pub fn clear(&self) {
        self.save(&[]);
    }

    /// Current cart contents.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.cache.get(CART_KEY).unwrap_or_default()
    }

    /// Sum of price times quantity over all items.
    ///
    /// Decimal arithmetic keeps the result exact and independent of item
    /// order.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items().iter().map(CartItem::line_total).sum()
    }

    /// Total quantity across all items (badge count).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items().iter().map(|i| i.quantity).sum()
    }

    fn save(&self, items: &[CartItem]) {
        self.cache.set_for(CART_KEY, items, CART_DURATION);
        // Nobody listening is fine
        let _ = self.changed.send(());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::dec;

    use super::*;
    use crate::cache::MemoryStore;

    fn product(id: i32, price: Decimal) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: "test product".to_string(),
            category: "beats".to_string(),
            price,
            image_url: format!("https://img.test/{id}.jpg"),
            is_new: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn cart() -> Cart {
        Cart::new(Cache::new(Arc::new(MemoryStore::new())))
    }

    #[test]
    fn test_add_same_product_twice_merges_quantities() {
        let cart = cart();
        let p = product(1, dec!(9.99));

        cart.add(&p, 1);
        cart.add(&p, 1);

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 2);
    }

    #[test]
    fn test_add_distinct_products_appends() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 1);
        cart.add(&product(2, dec!(3.00)), 4);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.count(), 5);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 0);
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_remove_absent_product_is_noop() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 1);
        cart.remove(ProductId::new(99));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_remove_deletes_item() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 2);
        cart.remove(ProductId::new(1));
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_set_quantity_zero_is_noop() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 3);

        let before = cart.items();
        cart.set_quantity(ProductId::new(1), 0);
        assert_eq!(cart.items(), before);
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 3);
        cart.set_quantity(ProductId::new(1), 7);
        assert_eq!(cart.items().first().unwrap().quantity, 7);
    }

    #[test]
    fn test_clear_empties_cart() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 2);
        cart.add(&product(2, dec!(1.25)), 1);
        cart.clear();
        assert!(cart.items().is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_total_price_sums_lines() {
        let cart = cart();
        cart.add(&product(1, dec!(9.99)), 2);
        cart.add(&product(2, dec!(0.01)), 3);

        assert_eq!(cart.total_price(), dec!(20.01));
    }

    #[test]
    fn test_total_price_independent_of_operation_order() {
        let a = product(1, dec!(4.50));
        let b = product(2, dec!(12.00));
        let c = product(3, dec!(0.99));

        // Two operation sequences producing the same final item set
        let first = cart();
        first.add(&a, 2);
        first.add(&b, 1);
        first.add(&c, 5);
        first.remove(b.id);

        let second = cart();
        second.add(&c, 1);
        second.add(&a, 1);
        second.set_quantity(c.id, 5);
        second.add(&a, 1);

        assert_eq!(first.total_price(), second.total_price());
        assert_eq!(first.total_price(), dec!(13.95));
    }

    #[test]
    fn test_mutations_notify_subscribers() {
        let cart = cart();
        let mut rx = cart.subscribe();

        cart.add(&product(1, dec!(5.00)), 1);
        assert!(rx.try_recv().is_ok());

        cart.set_quantity(ProductId::new(1), 2);
        assert!(rx.try_recv().is_ok());

        cart.clear();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_rejected_quantity_update_does_not_notify() {
        let cart = cart();
        cart.add(&product(1, dec!(5.00)), 1);

        let mut rx = cart.subscribe();
        cart.set_quantity(ProductId::new(1), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cart_persists_across_instances_sharing_a_store() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

        let first = Cart::new(Cache::new(store.clone()));
        first.add(&product(1, dec!(5.00)), 2);

        // A later page load constructs a fresh Cart over the same store
        let second = Cart::new(Cache::new(store));
        assert_eq!(second.count(), 2);
    }
}
