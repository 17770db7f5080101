use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::order::ProductId;

/// Shopping cart held in the volatile store: product id to a positive quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: BTreeMap<ProductId, i32>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, product_id: ProductId) -> i32 {
        self.items.get(&product_id).copied().unwrap_or(0)
    }

    /// Non-positive amounts are ignored so a stored line is always positive.
    pub fn add(&mut self, product_id: ProductId, quantity: i32) {
        if quantity <= 0 {
            return;
        }
        let line = self.items.entry(product_id).or_insert(0);
        *line = line.saturating_add(quantity);
    }

    /// Subtracts `quantity` (0 means 1). A line that would drop to zero or
    /// below is removed. Unknown products and negative amounts are ignored.
    pub fn remove(&mut self, product_id: ProductId, quantity: i32) {
        if quantity < 0 {
            return;
        }
        let quantity = quantity.max(1);
        let Some(current) = self.items.get_mut(&product_id) else {
            return;
        };
        if *current > quantity {
            *current -= quantity;
        } else {
            self.items.remove(&product_id);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
    pub available: bool,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_price: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_quantity() {
        let mut cart = Cart::default();
        cart.add(7, 2);
        cart.add(7, 3);
        assert_eq!(cart.quantity_of(7), 5);
    }

    #[test]
    fn add_ignores_non_positive_amounts() {
        let mut cart = Cart::default();
        cart.add(7, 0);
        cart.add(7, -4);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_zero_defaults_to_one() {
        let mut cart = Cart::default();
        cart.add(1, 3);
        cart.remove(1, 0);
        assert_eq!(cart.quantity_of(1), 2);
    }

    #[test]
    fn remove_drops_line_instead_of_storing_zero() {
        let mut cart = Cart::default();
        cart.add(1, 2);
        cart.remove(1, 2);
        assert!(!cart.items.contains_key(&1));

        cart.add(2, 1);
        cart.remove(2, 10);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_never_grows_a_line() {
        let mut cart = Cart::default();
        cart.add(1, 5);
        cart.remove(1, -100);
        cart.remove(1, i32::MIN);
        assert_eq!(cart.quantity_of(1), 5);

        cart.remove(1, i32::MAX);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_unknown_product_is_noop() {
        let mut cart = Cart::default();
        cart.add(1, 2);
        let before = cart.clone();
        cart.remove(99, 1);
        assert_eq!(cart, before);
    }

    #[test]
    fn json_shape_survives_storage() {
        let mut cart = Cart::default();
        cart.add(3, 4);
        let raw = serde_json::to_string(&cart).expect("serialize");
        assert_eq!(raw, r#"{"items":{"3":4}}"#);
        let back: Cart = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(back, cart);
    }
}
