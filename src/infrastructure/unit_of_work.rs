use std::cell::RefCell;

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::Connection;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    NewOrder, OrderId, OrderLineInput, OrderStatus, OrderView, ProductId, ProductStock, UserId,
};
use crate::domain::ports::{InventoryGateway, OrderLedger, UnitOfWork};
use crate::domain::search::OrderSearch;

use super::{inventory_repo, order_repo};

/// Runs each unit of work inside one Postgres transaction.
pub struct DieselUnitOfWork {
    pool: DbPool,
}

impl DieselUnitOfWork {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWork for DieselUnitOfWork {
    fn atomically<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&dyn InventoryGateway, &dyn OrderLedger) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<_, DomainError, _>(|conn| {
            let scope = TransactionScope {
                conn: RefCell::new(conn),
            };
            work(&scope, &scope)
        })
    }
}

/// Inventory and ledger views bound to the connection of an open transaction.
struct TransactionScope<'c> {
    conn: RefCell<&'c mut PgConnection>,
}

impl TransactionScope<'_> {
    fn with_conn<T>(
        &self,
        query: impl FnOnce(&mut PgConnection) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut conn = self
            .conn
            .try_borrow_mut()
            .map_err(|_| DomainError::server("transaction connection is already in use"))?;
        query(&mut **conn)
    }
}

impl InventoryGateway for TransactionScope<'_> {
    fn get_product(&self, id: ProductId) -> Result<Option<ProductStock>, DomainError> {
        self.with_conn(|conn| inventory_repo::find_product(conn, id))
    }

    fn decrement_quantity(&self, id: ProductId, amount: i32) -> Result<bool, DomainError> {
        self.with_conn(|conn| inventory_repo::decrement_if_sufficient(conn, id, amount))
    }

    fn increment_quantity(&self, id: ProductId, amount: i32) -> Result<(), DomainError> {
        self.with_conn(|conn| inventory_repo::restock(conn, id, amount))
    }
}

impl OrderLedger for TransactionScope<'_> {
    fn create(&self, order: &NewOrder) -> Result<OrderId, DomainError> {
        self.with_conn(|conn| order_repo::insert_order(conn, order))
    }

    fn add_lines(&self, order_id: OrderId, lines: &[OrderLineInput]) -> Result<(), DomainError> {
        self.with_conn(|conn| order_repo::insert_lines(conn, order_id, lines))
    }

    fn get_by_id(&self, order_id: OrderId) -> Result<OrderView, DomainError> {
        self.with_conn(|conn| order_repo::load_order(conn, order_id))
    }

    fn current_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>, DomainError> {
        self.with_conn(|conn| order_repo::lock_status(conn, order_id))
    }

    fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), DomainError> {
        self.with_conn(|conn| order_repo::update_status(conn, order_id, status))
    }

    fn search(&self, filter: &OrderSearch) -> Result<Vec<OrderView>, DomainError> {
        self.with_conn(|conn| order_repo::search_orders(conn, filter))
    }

    fn owner_and_date(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(DateTime<Utc>, OrderStatus)>, DomainError> {
        self.with_conn(|conn| order_repo::find_owned(conn, order_id, user_id))
    }
}
