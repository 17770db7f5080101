use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLineView, CartView};
use crate::domain::errors::DomainError;
use crate::domain::order::ProductId;
use crate::domain::ports::{CartStore, InventoryGateway};

pub struct CartService<C, I> {
    carts: C,
    inventory: I,
}

impl<C: CartStore, I: InventoryGateway> CartService<C, I> {
    pub fn new(carts: C, inventory: I) -> Self {
        Self { carts, inventory }
    }

    /// Allocates a fresh handle and stores an empty cart under it.
    pub fn create_cart_session(&self) -> Result<String, DomainError> {
        let handle = Uuid::new_v4().to_string();
        self.carts.set(&handle, &Cart::default())?;
        log::info!("cart session {handle} created");
        Ok(handle)
    }

    /// Adds `quantity` units after checking the catalog can cover what the
    /// cart would then hold.
    pub fn add_item(&self, handle: &str, product_id: ProductId, quantity: i32) -> Result<(), DomainError> {
        if quantity <= 0 {
            return Err(DomainError::bad_request("quantity must be positive"));
        }
        let product = self
            .inventory
            .get_product(product_id)?
            .ok_or_else(|| DomainError::bad_request(format!("unknown product {product_id}")))?;

        let wanted = self
            .carts
            .get(handle)?
            .quantity_of(product_id)
            .saturating_add(quantity);
        if !product.can_supply(wanted) {
            log::warn!(
                "cart {handle}: {wanted} of {} requested, {} in stock",
                product.name,
                product.quantity
            );
            return Err(DomainError::not_allowed(format!(
                "requested quantity of {} is unavailable",
                product.name
            )));
        }

        self.carts.add_item(handle, product_id, quantity)
    }

    /// Takes `quantity` units out of the cart; 0 removes a single unit.
    pub fn remove_item(&self, handle: &str, product_id: ProductId, quantity: i32) -> Result<(), DomainError> {
        if quantity < 0 {
            return Err(DomainError::bad_request("quantity must not be negative"));
        }
        self.carts.remove_item(handle, product_id, quantity)
    }

    pub fn has_items(&self, handle: &str) -> Result<bool, DomainError> {
        Ok(!self.carts.get(handle)?.is_empty())
    }

    pub fn delete_cart(&self, handle: &str) -> Result<(), DomainError> {
        self.carts.delete(handle)
    }

    /// Prices the cart at current catalog prices. Lines whose product has
    /// since disappeared from the catalog are left out.
    pub fn cart_view(&self, handle: &str) -> Result<CartView, DomainError> {
        let cart = self.carts.get(handle)?;
        let mut items = Vec::with_capacity(cart.items.len());
        let mut total_price = BigDecimal::from(0);

        for (&product_id, &quantity) in &cart.items {
            let Some(product) = self.inventory.get_product(product_id)? else {
                log::warn!("cart {handle} references missing product {product_id}");
                continue;
            };
            let line_total = &product.unit_price * BigDecimal::from(quantity);
            total_price += &line_total;
            items.push(CartLineView {
                product_id,
                name: product.name,
                quantity,
                unit_price: product.unit_price,
                line_total,
                available: product.available,
            });
        }

        Ok(CartView { items, total_price })
    }
}
