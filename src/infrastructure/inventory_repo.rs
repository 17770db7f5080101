use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{ProductId, ProductStock};
use crate::domain::ports::InventoryGateway;
use crate::schema::products;

use super::models::ProductRow;

// ── Queries shared by the pooled gateway and the transaction scope ───────────

pub(crate) fn find_product(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<ProductStock>, DomainError> {
    let row = products::table
        .find(id)
        .select(ProductRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(ProductStock::from))
}

/// Single conditional UPDATE so concurrent confirmations can never drive the
/// stock count below zero.
pub(crate) fn decrement_if_sufficient(
    conn: &mut PgConnection,
    id: ProductId,
    amount: i32,
) -> Result<bool, DomainError> {
    let updated = diesel::update(
        products::table
            .filter(products::id.eq(id))
            .filter(products::available.eq(true))
            .filter(products::quantity.ge(amount)),
    )
    .set(products::quantity.eq(products::quantity - amount))
    .execute(conn)?;
    Ok(updated == 1)
}

pub(crate) fn restock(conn: &mut PgConnection, id: ProductId, amount: i32) -> Result<(), DomainError> {
    let updated = diesel::update(products::table.filter(products::id.eq(id)))
        .set(products::quantity.eq(products::quantity + amount))
        .execute(conn)?;
    if updated == 0 {
        return Err(DomainError::not_found(format!("product {id}")));
    }
    Ok(())
}

// ── Gateway ───────────────────────────────────────────────────────────────────

pub struct DieselInventoryGateway {
    pool: DbPool,
}

impl DieselInventoryGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl InventoryGateway for DieselInventoryGateway {
    fn get_product(&self, id: ProductId) -> Result<Option<ProductStock>, DomainError> {
        let mut conn = self.pool.get()?;
        find_product(&mut conn, id)
    }

    fn decrement_quantity(&self, id: ProductId, amount: i32) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        decrement_if_sufficient(&mut conn, id, amount)
    }

    fn increment_quantity(&self, id: ProductId, amount: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        restock(&mut conn, id, amount)
    }
}
