//! In-memory adapters for the storage ports, backing the service and handler tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Identity, NewOrder, OrderId, OrderLineInput, OrderLineView, OrderStatus, OrderView, OwnerView,
    ProductId, ProductStock, UserId,
};
use crate::domain::ports::{CartStore, IdentityLookup, InventoryGateway, OrderLedger, UnitOfWork};
use crate::domain::search::OrderSearch;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::server("in-memory store lock poisoned"))
}

// ── Carts ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct InMemoryCartStore {
    carts: Mutex<HashMap<String, (Cart, Instant)>>,
    ttl: Duration,
}

impl InMemoryCartStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            carts: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Whether a key is stored at all, as opposed to holding an empty cart.
    pub fn contains(&self, handle: &str) -> bool {
        lock(&self.carts)
            .map(|carts| {
                carts
                    .get(handle)
                    .is_some_and(|(_, expires)| Instant::now() < *expires)
            })
            .unwrap_or(false)
    }

    fn live(carts: &HashMap<String, (Cart, Instant)>, handle: &str) -> Cart {
        match carts.get(handle) {
            Some((cart, expires)) if Instant::now() < *expires => cart.clone(),
            _ => Cart::default(),
        }
    }
}

impl Default for InMemoryCartStore {
    fn default() -> Self {
        Self::new(super::cart_store::DEFAULT_CART_TTL)
    }
}

impl CartStore for InMemoryCartStore {
    fn get(&self, handle: &str) -> Result<Cart, DomainError> {
        let carts = lock(&self.carts)?;
        Ok(Self::live(&carts, handle))
    }

    fn set(&self, handle: &str, cart: &Cart) -> Result<(), DomainError> {
        let mut carts = lock(&self.carts)?;
        carts.insert(handle.to_string(), (cart.clone(), Instant::now() + self.ttl));
        Ok(())
    }

    fn update(&self, handle: &str, mutate: &dyn Fn(&mut Cart)) -> Result<Cart, DomainError> {
        let mut carts = lock(&self.carts)?;
        let mut cart = Self::live(&carts, handle);
        mutate(&mut cart);
        carts.insert(handle.to_string(), (cart.clone(), Instant::now() + self.ttl));
        Ok(cart)
    }

    fn delete(&self, handle: &str) -> Result<(), DomainError> {
        lock(&self.carts)?.remove(handle);
        Ok(())
    }
}

// ── Identities ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryIdentities {
    sessions: Mutex<HashMap<String, Identity>>,
}

impl InMemoryIdentities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, session: &str, user_id: UserId, role: &str) {
        if let Ok(mut sessions) = lock(&self.sessions) {
            sessions.insert(
                session.to_string(),
                Identity {
                    user_id,
                    role: role.to_string(),
                },
            );
        }
    }
}

impl IdentityLookup for InMemoryIdentities {
    fn resolve(&self, session: &str) -> Result<Option<Identity>, DomainError> {
        Ok(lock(&self.sessions)?.get(session).cloned())
    }
}

// ── Inventory + ledger ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredOrder {
    user_id: UserId,
    date: DateTime<Utc>,
    status: OrderStatus,
    total_price: BigDecimal,
    lines: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    products: HashMap<ProductId, ProductStock>,
    users: HashMap<UserId, OwnerView>,
    orders: BTreeMap<OrderId, StoredOrder>,
    next_order_id: OrderId,
}

impl StoreState {
    fn view(&self, id: OrderId, order: &StoredOrder) -> Result<OrderView, DomainError> {
        let owner = self
            .users
            .get(&order.user_id)
            .cloned()
            .ok_or_else(|| DomainError::server(format!("order {id} references missing user")))?;
        let lines = order
            .lines
            .iter()
            .map(|l| {
                let product = self.products.get(&l.product_id).ok_or_else(|| {
                    DomainError::server(format!("order {id} references missing product"))
                })?;
                Ok(OrderLineView {
                    product_id: l.product_id,
                    name: product.name.clone(),
                    manufacturer: product.manufacturer.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                    line_total: l.line_total(),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        Ok(OrderView {
            id,
            date: order.date,
            status: order.status,
            total_price: order.total_price.clone(),
            owner,
            lines,
        })
    }
}

/// Products, users and orders behind one lock. Units of work are serialized
/// and roll back by restoring a snapshot taken before the work ran.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    work: Mutex<()>,
    fail_lookups: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: UserId, nickname: &str, role: &str) {
        if let Ok(mut state) = lock(&self.state) {
            state.users.insert(
                id,
                OwnerView {
                    id,
                    nickname: nickname.to_string(),
                    role: role.to_string(),
                },
            );
        }
    }

    pub fn add_product(&self, id: ProductId, name: &str, quantity: i32, price: BigDecimal, available: bool) {
        if let Ok(mut state) = lock(&self.state) {
            state.products.insert(
                id,
                ProductStock {
                    id,
                    name: name.to_string(),
                    manufacturer: format!("{name} Co"),
                    quantity,
                    unit_price: price,
                    available,
                },
            );
        }
    }

    pub fn set_stock(&self, id: ProductId, quantity: i32, available: bool) {
        if let Ok(mut state) = lock(&self.state) {
            if let Some(product) = state.products.get_mut(&id) {
                product.quantity = quantity;
                product.available = available;
            }
        }
    }

    pub fn set_price(&self, id: ProductId, price: BigDecimal) {
        if let Ok(mut state) = lock(&self.state) {
            if let Some(product) = state.products.get_mut(&id) {
                product.unit_price = price;
            }
        }
    }

    /// Moves an order's creation instant, for exercising the cancellation window.
    pub fn set_order_date(&self, id: OrderId, date: DateTime<Utc>) {
        if let Ok(mut state) = lock(&self.state) {
            if let Some(order) = state.orders.get_mut(&id) {
                order.date = date;
            }
        }
    }

    /// Makes product lookups fail as if the backing store were unreachable.
    pub fn fail_lookups(&self, fail: bool) {
        if let Ok(mut flag) = lock(&self.fail_lookups) {
            *flag = fail;
        }
    }

    pub fn stock_of(&self, id: ProductId) -> Option<i32> {
        lock(&self.state)
            .ok()
            .and_then(|state| state.products.get(&id).map(|p| p.quantity))
    }

    pub fn order_count(&self) -> usize {
        lock(&self.state).map(|state| state.orders.len()).unwrap_or(0)
    }
}

impl InventoryGateway for InMemoryStore {
    fn get_product(&self, id: ProductId) -> Result<Option<ProductStock>, DomainError> {
        if *lock(&self.fail_lookups)? {
            return Err(DomainError::server("product store unavailable"));
        }
        Ok(lock(&self.state)?.products.get(&id).cloned())
    }

    fn decrement_quantity(&self, id: ProductId, amount: i32) -> Result<bool, DomainError> {
        let mut state = lock(&self.state)?;
        match state.products.get_mut(&id) {
            Some(product) if product.can_supply(amount) => {
                product.quantity -= amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn increment_quantity(&self, id: ProductId, amount: i32) -> Result<(), DomainError> {
        let mut state = lock(&self.state)?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        product.quantity += amount;
        Ok(())
    }
}

impl OrderLedger for InMemoryStore {
    fn create(&self, order: &NewOrder) -> Result<OrderId, DomainError> {
        let mut state = lock(&self.state)?;
        state.next_order_id += 1;
        let id = state.next_order_id;
        state.orders.insert(
            id,
            StoredOrder {
                user_id: order.user_id,
                date: order.date,
                status: order.status,
                total_price: order.total_price.clone(),
                lines: order.lines.clone(),
            },
        );
        Ok(id)
    }

    fn add_lines(&self, order_id: OrderId, lines: &[OrderLineInput]) -> Result<(), DomainError> {
        let mut state = lock(&self.state)?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        order.lines.extend_from_slice(lines);
        Ok(())
    }

    fn get_by_id(&self, order_id: OrderId) -> Result<OrderView, DomainError> {
        let state = lock(&self.state)?;
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        state.view(order_id, order)
    }

    fn current_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>, DomainError> {
        Ok(lock(&self.state)?.orders.get(&order_id).map(|o| o.status))
    }

    fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), DomainError> {
        let mut state = lock(&self.state)?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        order.status = status;
        Ok(())
    }

    fn search(&self, filter: &OrderSearch) -> Result<Vec<OrderView>, DomainError> {
        let state = lock(&self.state)?;
        let mut found = Vec::new();
        for (id, order) in &state.orders {
            let view = state.view(*id, order)?;
            if filter.matches(&view) {
                found.push(view);
            }
        }
        if found.is_empty() {
            return Err(DomainError::not_found("no orders match the filter"));
        }
        Ok(found)
    }

    fn owner_and_date(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(DateTime<Utc>, OrderStatus)>, DomainError> {
        Ok(lock(&self.state)?
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .map(|o| (o.date, o.status)))
    }
}

impl UnitOfWork for InMemoryStore {
    fn atomically<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&dyn InventoryGateway, &dyn OrderLedger) -> Result<T, DomainError>,
    {
        let _serialized = lock(&self.work)?;
        let snapshot = lock(&self.state)?.clone();
        let result = work(self, self);
        if result.is_err() {
            *lock(&self.state)? = snapshot;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bigdecimal::BigDecimal;

    use super::*;

    #[test]
    fn expired_cart_reads_as_empty() {
        let store = InMemoryCartStore::new(Duration::ZERO);
        store.add_item("h", 1, 1).expect("add");

        assert!(store.get("h").expect("get").is_empty());
        assert!(!store.contains("h"));
    }

    #[test]
    fn update_applies_transform_atomically() {
        let store = InMemoryCartStore::default();
        store.add_item("h", 1, 2).expect("add");

        let cart = store
            .update("h", &|cart: &mut Cart| cart.add(1, 3))
            .expect("update");
        assert_eq!(cart.quantity_of(1), 5);
        assert_eq!(store.get("h").expect("get").quantity_of(1), 5);
    }

    #[test]
    fn concurrent_adds_are_all_kept() {
        let store = InMemoryCartStore::default();

        std::thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| store.add_item("h", 1, 1).expect("add"));
            }
        });

        assert_eq!(store.get("h").expect("get").quantity_of(1), 16);
    }

    #[test]
    fn take_empties_the_cart_and_restore_merges_back() {
        let store = InMemoryCartStore::default();
        store.add_item("h", 1, 2).expect("add");

        let taken = store.take("h").expect("take");
        assert_eq!(taken.quantity_of(1), 2);
        assert!(store.get("h").expect("get").is_empty());
        assert!(store.contains("h"));

        store.add_item("h", 1, 1).expect("add");
        store.restore("h", &taken).expect("restore");
        assert_eq!(store.get("h").expect("get").quantity_of(1), 3);
    }

    #[test]
    fn unit_of_work_restores_snapshot_on_error() {
        let store = InMemoryStore::new();
        store.add_product(1, "Kite", 5, BigDecimal::from(3), true);

        let result: Result<(), DomainError> = store.atomically(|inventory, _| {
            inventory.decrement_quantity(1, 2)?;
            Err(DomainError::not_allowed("stop"))
        });

        assert!(result.is_err());
        assert_eq!(store.stock_of(1), Some(5));
    }

    #[test]
    fn conditional_decrement_refuses_shortfall() {
        let store = InMemoryStore::new();
        store.add_product(1, "Kite", 1, BigDecimal::from(3), true);

        assert!(!store.decrement_quantity(1, 2).expect("decrement"));
        assert!(store.decrement_quantity(1, 1).expect("decrement"));
        assert_eq!(store.stock_of(1), Some(0));
    }
}
