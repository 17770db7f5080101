use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use super::errors::DomainError;

pub type OrderId = i32;
pub type ProductId = i32;
pub type UserId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Created,
    Confirmed,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Created)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "rejected" => Ok(OrderStatus::Rejected),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::bad_request(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// Live stock record as reported by the inventory store.
#[derive(Debug, Clone)]
pub struct ProductStock {
    pub id: ProductId,
    pub name: String,
    pub manufacturer: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub available: bool,
}

impl ProductStock {
    pub fn can_supply(&self, quantity: i32) -> bool {
        self.available && self.quantity >= quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: String,
}

impl Identity {
    pub fn is_manager(&self) -> bool {
        self.role == "manager"
    }
}

/// A line as persisted: the unit price is the catalog price at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl OrderLineInput {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_price: BigDecimal,
    pub lines: Vec<OrderLineInput>,
}

impl NewOrder {
    /// Builds a `created` order whose total is derived from the lines.
    pub fn created(user_id: UserId, date: DateTime<Utc>, lines: Vec<OrderLineInput>) -> Self {
        let total_price = lines
            .iter()
            .fold(BigDecimal::from(0), |acc, l| acc + l.line_total());
        Self {
            user_id,
            date,
            status: OrderStatus::Created,
            total_price,
            lines,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OwnerView {
    pub id: UserId,
    pub nickname: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub name: String,
    pub manufacturer: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_price: BigDecimal,
    pub owner: OwnerView,
    pub lines: Vec<OrderLineView>,
}
