use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};

use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Identity, NewOrder, OrderId, OrderLineInput, OrderLineView, OrderStatus, OrderView,
};
use crate::domain::ports::{CartStore, IdentityLookup, InventoryGateway, OrderLedger, UnitOfWork};
use crate::domain::search::OrderSearch;

/// Rules for owner-initiated cancellation.
#[derive(Debug, Clone, Copy)]
pub struct CancellationPolicy {
    /// Maximum age of an order that may still be cancelled.
    pub window: Duration,
    /// Whether a confirmed order may be cancelled inside the window. Its stock
    /// is returned to inventory when it is.
    pub allow_confirmed: bool,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            window: Duration::minutes(10),
            allow_confirmed: false,
        }
    }
}

/// Order lifecycle: cart checkout, confirmation against live stock,
/// rejection, owner cancellation and order queries.
pub struct OrderWorkflow<C, I, L, A, U> {
    carts: C,
    inventory: I,
    ledger: L,
    identities: A,
    uow: U,
    policy: CancellationPolicy,
}

impl<C, I, L, A, U> OrderWorkflow<C, I, L, A, U>
where
    C: CartStore,
    I: InventoryGateway,
    L: OrderLedger,
    A: IdentityLookup,
    U: UnitOfWork,
{
    pub fn new(carts: C, inventory: I, ledger: L, identities: A, uow: U) -> Self {
        Self {
            carts,
            inventory,
            ledger,
            identities,
            uow,
            policy: CancellationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CancellationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CancellationPolicy {
        self.policy
    }

    pub fn identify(&self, session: &str) -> Result<Identity, DomainError> {
        self.identities
            .resolve(session)?
            .ok_or(DomainError::Unauthorized)
    }

    /// Turns the cart into a `created` order. The cart is emptied atomically
    /// up front so a concurrent checkout of the same handle finds nothing to
    /// order; when validation or persistence fails its items are put back.
    /// Stock is only decremented on confirmation.
    pub fn create_order(&self, session: &str, cart_handle: &str) -> Result<OrderId, DomainError> {
        let identity = self.identify(session)?;

        let cart = self.carts.take(cart_handle)?;
        if cart.is_empty() {
            log::warn!("create_order: cart {cart_handle} is empty");
            return Err(DomainError::bad_request("nothing to order"));
        }

        match self.place_order(&identity, &cart) {
            Ok((order_id, total_price)) => {
                log::info!(
                    "order {order_id} created for user {} (total {total_price})",
                    identity.user_id
                );
                Ok(order_id)
            }
            Err(e) => {
                if let Err(restore) = self.carts.restore(cart_handle, &cart) {
                    log::error!("create_order: could not restore cart {cart_handle}: {restore}");
                }
                Err(e)
            }
        }
    }

    /// Validates every line against the catalog, then persists the order.
    fn place_order(
        &self,
        identity: &Identity,
        cart: &Cart,
    ) -> Result<(OrderId, BigDecimal), DomainError> {
        let mut lines = Vec::with_capacity(cart.items.len());
        for (&product_id, &quantity) in &cart.items {
            let product = self.inventory.get_product(product_id).map_err(|e| {
                log::error!("create_order: lookup of product {product_id} failed: {e}");
                DomainError::server(format!("product {product_id} lookup failed"))
            })?;
            let Some(product) = product else {
                log::warn!("create_order: product {product_id} does not exist");
                return Err(DomainError::not_allowed(format!(
                    "product {product_id} is unavailable"
                )));
            };
            if !product.available {
                log::warn!("create_order: product {} is unavailable", product.name);
                return Err(DomainError::not_allowed(format!(
                    "product {} is unavailable",
                    product.name
                )));
            }
            if product.quantity < quantity {
                log::warn!(
                    "create_order: {} requested of {}, {} in stock",
                    quantity,
                    product.name,
                    product.quantity
                );
                return Err(DomainError::not_allowed(format!(
                    "requested quantity of {} is unavailable",
                    product.name
                )));
            }
            lines.push(OrderLineInput {
                product_id,
                quantity,
                unit_price: product.unit_price,
            });
        }

        let order = NewOrder::created(identity.user_id, Utc::now(), lines);
        let order_id = self.ledger.create(&order)?;
        Ok((order_id, order.total_price))
    }

    pub fn get_order(&self, order_id: OrderId) -> Result<OrderView, DomainError> {
        self.ledger.get_by_id(order_id)
    }

    pub fn search_orders(&self, filter: &OrderSearch) -> Result<Vec<OrderView>, DomainError> {
        self.ledger.search(filter)
    }

    pub fn current_user_orders(&self, session: &str) -> Result<Vec<OrderView>, DomainError> {
        let identity = self.identify(session)?;
        self.ledger.search(&OrderSearch::for_user(identity.user_id))
    }

    /// Moves a `created` order to `confirmed` or `rejected`. Confirmation
    /// re-checks live stock and decrements it for every line; the decrements
    /// and the status change commit together or not at all.
    pub fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), DomainError> {
        if !matches!(status, OrderStatus::Confirmed | OrderStatus::Rejected) {
            return Err(DomainError::bad_request(format!(
                "status must be confirmed or rejected, got {status}"
            )));
        }

        self.uow.atomically(|inventory, ledger| {
            let current = ledger
                .current_status(order_id)?
                .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
            if current != OrderStatus::Created {
                log::warn!("set_order_status: order {order_id} is already {current}");
                return Err(DomainError::not_allowed(format!(
                    "order {order_id} is {current}, only created orders can change status"
                )));
            }

            if status == OrderStatus::Confirmed {
                let order = ledger.get_by_id(order_id)?;
                commit_stock(inventory, &order)?;
            }
            ledger.set_status(order_id, status)
        })?;

        log::info!("order {order_id} is now {status}");
        Ok(())
    }

    /// Owner cancellation inside the policy window. Non-owners get `NotFound`
    /// so the order's existence is not revealed.
    pub fn cancel_order(&self, order_id: OrderId, session: &str) -> Result<(), DomainError> {
        let identity = self.identify(session)?;
        let now = Utc::now();
        let policy = self.policy;

        self.uow.atomically(|inventory, ledger| {
            let (date, status) = ledger
                .owner_and_date(order_id, identity.user_id)?
                .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;

            if now - date > policy.window {
                log::warn!("cancel_order: order {order_id} is past the cancellation window");
                return Err(DomainError::not_allowed("cancellation window has expired"));
            }

            match status {
                OrderStatus::Created => {}
                OrderStatus::Confirmed if policy.allow_confirmed => {
                    let mut lines = ledger.get_by_id(order_id)?.lines;
                    lines.sort_by_key(|line| line.product_id);
                    for line in lines {
                        inventory.increment_quantity(line.product_id, line.quantity)?;
                    }
                }
                other => {
                    log::warn!("cancel_order: order {order_id} is {other}");
                    return Err(DomainError::not_allowed(format!(
                        "order {order_id} is {other} and cannot be cancelled"
                    )));
                }
            }
            ledger.set_status(order_id, OrderStatus::Cancelled)
        })?;

        log::info!("order {order_id} cancelled by user {}", identity.user_id);
        Ok(())
    }
}

/// Lines are handled in product id order so concurrent confirmations lock
/// product rows in the same sequence.
fn commit_stock(inventory: &dyn InventoryGateway, order: &OrderView) -> Result<(), DomainError> {
    let mut lines: Vec<&OrderLineView> = order.lines.iter().collect();
    lines.sort_by_key(|line| line.product_id);

    for line in &lines {
        let live = inventory.get_product(line.product_id)?;
        if !live.is_some_and(|p| p.can_supply(line.quantity)) {
            log::warn!(
                "confirm: order {} needs {} of product {}, not in stock",
                order.id,
                line.quantity,
                line.product_id
            );
            return Err(DomainError::not_allowed(format!(
                "required quantity of product {} is unavailable",
                line.product_id
            )));
        }
    }
    for line in &lines {
        if !inventory.decrement_quantity(line.product_id, line.quantity)? {
            return Err(DomainError::not_allowed(format!(
                "product {} sold out during confirmation",
                line.product_id
            )));
        }
    }
    Ok(())
}
