use std::cell::RefCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::cart::Cart;
use super::errors::DomainError;
use super::order::{
    Identity, NewOrder, OrderId, OrderLineInput, OrderStatus, OrderView, ProductId, ProductStock,
    UserId,
};
use super::search::OrderSearch;

/// Volatile per-handle cart storage. Every write refreshes the expiration.
pub trait CartStore: Send + Sync + 'static {
    /// Returns an empty cart when nothing is stored under `handle`.
    fn get(&self, handle: &str) -> Result<Cart, DomainError>;
    fn set(&self, handle: &str, cart: &Cart) -> Result<(), DomainError>;
    /// Atomic read-modify-write of one cart. `mutate` may run more than once.
    fn update(&self, handle: &str, mutate: &dyn Fn(&mut Cart)) -> Result<Cart, DomainError>;
    fn delete(&self, handle: &str) -> Result<(), DomainError>;

    fn add_item(
        &self,
        handle: &str,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), DomainError> {
        self.update(handle, &|cart: &mut Cart| cart.add(product_id, quantity))
            .map(|_| ())
    }

    fn remove_item(
        &self,
        handle: &str,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), DomainError> {
        self.update(handle, &|cart: &mut Cart| cart.remove(product_id, quantity))
            .map(|_| ())
    }

    /// Leaves an empty mapping behind rather than deleting the key.
    fn clear(&self, handle: &str) -> Result<(), DomainError> {
        self.update(handle, &|cart: &mut Cart| cart.clear()).map(|_| ())
    }

    /// Atomically empties the cart and returns what it held. Of two
    /// concurrent takes on one handle, only one sees the items.
    fn take(&self, handle: &str) -> Result<Cart, DomainError> {
        let taken = RefCell::new(Cart::default());
        self.update(handle, &|cart: &mut Cart| {
            *taken.borrow_mut() = std::mem::take(cart);
        })?;
        Ok(taken.into_inner())
    }

    /// Merges `items` back into whatever the cart holds now.
    fn restore(&self, handle: &str, items: &Cart) -> Result<(), DomainError> {
        self.update(handle, &|cart: &mut Cart| {
            for (&product_id, &quantity) in &items.items {
                cart.add(product_id, quantity);
            }
        })
        .map(|_| ())
    }
}

pub trait InventoryGateway {
    fn get_product(&self, id: ProductId) -> Result<Option<ProductStock>, DomainError>;
    /// Decrements only when the product is available and holds at least
    /// `amount`; returns whether the decrement was applied.
    fn decrement_quantity(&self, id: ProductId, amount: i32) -> Result<bool, DomainError>;
    fn increment_quantity(&self, id: ProductId, amount: i32) -> Result<(), DomainError>;
}

pub trait OrderLedger {
    /// Persists the order together with its lines and returns the assigned id.
    fn create(&self, order: &NewOrder) -> Result<OrderId, DomainError>;
    fn add_lines(&self, order_id: OrderId, lines: &[OrderLineInput]) -> Result<(), DomainError>;
    fn get_by_id(&self, order_id: OrderId) -> Result<OrderView, DomainError>;
    /// Locks the order row when called inside a unit of work.
    fn current_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>, DomainError>;
    fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), DomainError>;
    /// Ascending by order id. No match is reported as `NotFound`.
    fn search(&self, filter: &OrderSearch) -> Result<Vec<OrderView>, DomainError>;
    fn owner_and_date(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(DateTime<Utc>, OrderStatus)>, DomainError>;
}

/// Runs `work` against inventory and ledger views that commit together, or
/// not at all when `work` returns an error.
pub trait UnitOfWork: Send + Sync + 'static {
    fn atomically<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&dyn InventoryGateway, &dyn OrderLedger) -> Result<T, DomainError>;
}

pub trait IdentityLookup: Send + Sync + 'static {
    fn resolve(&self, session: &str) -> Result<Option<Identity>, DomainError>;
}

// Shared adapters: one store instance can back several ports at once.

impl<T: CartStore + ?Sized> CartStore for Arc<T> {
    fn get(&self, handle: &str) -> Result<Cart, DomainError> {
        (**self).get(handle)
    }

    fn set(&self, handle: &str, cart: &Cart) -> Result<(), DomainError> {
        (**self).set(handle, cart)
    }

    fn update(&self, handle: &str, mutate: &dyn Fn(&mut Cart)) -> Result<Cart, DomainError> {
        (**self).update(handle, mutate)
    }

    fn delete(&self, handle: &str) -> Result<(), DomainError> {
        (**self).delete(handle)
    }
}

impl<T: InventoryGateway + ?Sized> InventoryGateway for Arc<T> {
    fn get_product(&self, id: ProductId) -> Result<Option<ProductStock>, DomainError> {
        (**self).get_product(id)
    }

    fn decrement_quantity(&self, id: ProductId, amount: i32) -> Result<bool, DomainError> {
        (**self).decrement_quantity(id, amount)
    }

    fn increment_quantity(&self, id: ProductId, amount: i32) -> Result<(), DomainError> {
        (**self).increment_quantity(id, amount)
    }
}

impl<T: OrderLedger + ?Sized> OrderLedger for Arc<T> {
    fn create(&self, order: &NewOrder) -> Result<OrderId, DomainError> {
        (**self).create(order)
    }

    fn add_lines(&self, order_id: OrderId, lines: &[OrderLineInput]) -> Result<(), DomainError> {
        (**self).add_lines(order_id, lines)
    }

    fn get_by_id(&self, order_id: OrderId) -> Result<OrderView, DomainError> {
        (**self).get_by_id(order_id)
    }

    fn current_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>, DomainError> {
        (**self).current_status(order_id)
    }

    fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), DomainError> {
        (**self).set_status(order_id, status)
    }

    fn search(&self, filter: &OrderSearch) -> Result<Vec<OrderView>, DomainError> {
        (**self).search(filter)
    }

    fn owner_and_date(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(DateTime<Utc>, OrderStatus)>, DomainError> {
        (**self).owner_and_date(order_id, user_id)
    }
}

impl<T: UnitOfWork> UnitOfWork for Arc<T> {
    fn atomically<R, F>(&self, work: F) -> Result<R, DomainError>
    where
        F: FnOnce(&dyn InventoryGateway, &dyn OrderLedger) -> Result<R, DomainError>,
    {
        (**self).atomically(work)
    }
}

impl<T: IdentityLookup + ?Sized> IdentityLookup for Arc<T> {
    fn resolve(&self, session: &str) -> Result<Option<Identity>, DomainError> {
        (**self).resolve(session)
    }
}
