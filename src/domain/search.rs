use chrono::{DateTime, Utc};

use super::errors::DomainError;
use super::order::{OrderStatus, OrderView, ProductId, UserId};

/// Validated order search filter. All present predicates are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderSearch {
    date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    user_id: Option<UserId>,
    status: Option<OrderStatus>,
    product_id: Option<ProductId>,
}

impl OrderSearch {
    /// Date bounds must come together and be strictly ordered. The range is
    /// half-open: `start <= date < end`.
    pub fn new(
        date_start: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
        user_id: Option<UserId>,
        status: Option<OrderStatus>,
        product_id: Option<ProductId>,
    ) -> Result<Self, DomainError> {
        let date_range = match (date_start, date_end) {
            (None, None) => None,
            (Some(start), Some(end)) if start < end => Some((start, end)),
            (Some(_), Some(_)) => {
                return Err(DomainError::bad_request(
                    "date range start must precede its end",
                ))
            }
            _ => {
                return Err(DomainError::bad_request(
                    "date range needs both a start and an end",
                ))
            }
        };
        if status == Some(OrderStatus::Cancelled) {
            return Err(DomainError::bad_request(
                "status filter must be created, confirmed or rejected",
            ));
        }
        Ok(Self {
            date_range,
            user_id,
            status,
            product_id,
        })
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.date_range
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.status
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    /// Evaluates the filter against an already hydrated order.
    pub fn matches(&self, order: &OrderView) -> bool {
        if let Some((start, end)) = self.date_range {
            if order.date < start || order.date >= end {
                return false;
            }
        }
        if self.user_id.is_some_and(|id| order.owner.id != id) {
            return false;
        }
        if self.status.is_some_and(|s| order.status != s) {
            return false;
        }
        if let Some(product_id) = self.product_id {
            if !order.lines.iter().any(|l| l.product_id == product_id) {
                return false;
            }
        }
        true
    }
}
