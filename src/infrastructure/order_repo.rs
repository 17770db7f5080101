use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    NewOrder, OrderId, OrderLineInput, OrderLineView, OrderStatus, OrderView, OwnerView, UserId,
};
use crate::domain::ports::OrderLedger;
use crate::domain::search::OrderSearch;
use crate::schema::{order_lines, orders, products, users};

use super::models::{NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow, UserRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        log::error!("database error: {e}");
        DomainError::ServerError(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        log::error!("connection pool error: {e}");
        DomainError::ServerError(e.to_string())
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, DomainError> {
    OrderStatus::from_str(raw)
        .map_err(|_| DomainError::server(format!("stored order has unknown status '{raw}'")))
}

// ── Queries shared by the pooled ledger and the transaction scope ────────────

pub(crate) fn insert_order(conn: &mut PgConnection, order: &NewOrder) -> Result<OrderId, DomainError> {
    conn.transaction::<_, DomainError, _>(|conn| {
        let order_id: OrderId = diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                user_id: order.user_id,
                date: order.date,
                total_price: &order.total_price,
                status: order.status.as_str(),
            })
            .returning(orders::id)
            .get_result(conn)?;

        insert_lines(conn, order_id, &order.lines)?;
        Ok(order_id)
    })
}

pub(crate) fn insert_lines(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[OrderLineInput],
) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Ok(());
    }
    let rows: Vec<NewOrderLineRow<'_>> = lines
        .iter()
        .map(|l| NewOrderLineRow {
            order_id,
            product_id: l.product_id,
            quantity: l.quantity,
            unit_price: &l.unit_price,
        })
        .collect();
    diesel::insert_into(order_lines::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

pub(crate) fn load_order(conn: &mut PgConnection, order_id: OrderId) -> Result<OrderView, DomainError> {
    let row = orders::table
        .find(order_id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;

    hydrate(conn, vec![row])?
        .pop()
        .ok_or_else(|| DomainError::server(format!("order {order_id} vanished while loading")))
}

pub(crate) fn lock_status(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<OrderStatus>, DomainError> {
    let status: Option<String> = orders::table
        .find(order_id)
        .select(orders::status)
        .for_update()
        .first(conn)
        .optional()?;
    status.as_deref().map(parse_status).transpose()
}

pub(crate) fn update_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
) -> Result<(), DomainError> {
    let updated = diesel::update(orders::table.find(order_id))
        .set(orders::status.eq(status.as_str()))
        .execute(conn)?;
    if updated == 0 {
        return Err(DomainError::not_found(format!("order {order_id}")));
    }
    Ok(())
}

/// Builds the boxed, conjunctive WHERE clause for a search filter.
fn filtered_orders(filter: &OrderSearch) -> orders::BoxedQuery<'static, Pg> {
    let mut query = orders::table.into_boxed();

    if let Some((start, end)) = filter.date_range() {
        query = query.filter(orders::date.ge(start)).filter(orders::date.lt(end));
    }
    if let Some(user_id) = filter.user_id() {
        query = query.filter(orders::user_id.eq(user_id));
    }
    if let Some(status) = filter.status() {
        query = query.filter(orders::status.eq(status.as_str()));
    }
    if let Some(product_id) = filter.product_id() {
        query = query.filter(
            orders::id.eq_any(
                order_lines::table
                    .filter(order_lines::product_id.eq(product_id))
                    .select(order_lines::order_id),
            ),
        );
    }
    query
}

pub(crate) fn search_orders(
    conn: &mut PgConnection,
    filter: &OrderSearch,
) -> Result<Vec<OrderView>, DomainError> {
    let rows = filtered_orders(filter)
        .select(OrderRow::as_select())
        .order(orders::id.asc())
        .load(conn)?;

    if rows.is_empty() {
        return Err(DomainError::not_found("no orders match the filter"));
    }
    hydrate(conn, rows)
}

pub(crate) fn find_owned(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
) -> Result<Option<(DateTime<Utc>, OrderStatus)>, DomainError> {
    let found: Option<(DateTime<Utc>, String)> = orders::table
        .filter(orders::id.eq(order_id))
        .filter(orders::user_id.eq(user_id))
        .select((orders::date, orders::status))
        .for_update()
        .first(conn)
        .optional()?;
    found
        .map(|(date, raw)| parse_status(&raw).map(|status| (date, status)))
        .transpose()
}

/// Joins owners and product names onto order rows. Line totals come from the
/// stored unit price, never from the current catalog price.
fn hydrate(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<OrderView>, DomainError> {
    let order_ids: Vec<i32> = rows.iter().map(|o| o.id).collect();
    let user_ids: Vec<i32> = rows.iter().map(|o| o.user_id).collect();

    let owners: HashMap<i32, UserRow> = users::table
        .filter(users::id.eq_any(&user_ids))
        .select(UserRow::as_select())
        .load(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut lines_by_order: HashMap<i32, Vec<OrderLineView>> = HashMap::new();
    let lines: Vec<(OrderLineRow, String, String)> = order_lines::table
        .inner_join(products::table)
        .filter(order_lines::order_id.eq_any(&order_ids))
        .select((
            OrderLineRow::as_select(),
            products::name,
            products::manufacturer,
        ))
        .order(order_lines::id.asc())
        .load(conn)?;
    for (line, name, manufacturer) in lines {
        let line_total = &line.unit_price * bigdecimal::BigDecimal::from(line.quantity);
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderLineView {
                product_id: line.product_id,
                name,
                manufacturer,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total,
            });
    }

    rows.into_iter()
        .map(|o| {
            let owner = owners.get(&o.user_id).ok_or_else(|| {
                DomainError::server(format!("order {} references missing user {}", o.id, o.user_id))
            })?;
            Ok(OrderView {
                id: o.id,
                date: o.date,
                status: parse_status(&o.status)?,
                total_price: o.total_price,
                owner: OwnerView {
                    id: owner.id,
                    nickname: owner.nickname.clone(),
                    role: owner.role.clone(),
                },
                lines: lines_by_order.remove(&o.id).unwrap_or_default(),
            })
        })
        .collect()
}

// ── Ledger ────────────────────────────────────────────────────────────────────

pub struct DieselOrderLedger {
    pool: DbPool,
}

impl DieselOrderLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderLedger for DieselOrderLedger {
    fn create(&self, order: &NewOrder) -> Result<OrderId, DomainError> {
        let mut conn = self.pool.get()?;
        insert_order(&mut conn, order)
    }

    fn add_lines(&self, order_id: OrderId, lines: &[OrderLineInput]) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        insert_lines(&mut conn, order_id, lines)
    }

    fn get_by_id(&self, order_id: OrderId) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        load_order(&mut conn, order_id)
    }

    fn current_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>, DomainError> {
        let mut conn = self.pool.get()?;
        lock_status(&mut conn, order_id)
    }

    fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        update_status(&mut conn, order_id, status)
    }

    fn search(&self, filter: &OrderSearch) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        search_orders(&mut conn, filter)
    }

    fn owner_and_date(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(DateTime<Utc>, OrderStatus)>, DomainError> {
        let mut conn = self.pool.get()?;
        find_owned(&mut conn, order_id, user_id)
    }
}
