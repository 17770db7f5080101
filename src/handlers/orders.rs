use std::str::FromStr;

use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{cookie_value, require_manager, session, AppState, Backend, CART_COOKIE};
use crate::domain::order::{OrderId, OrderStatus, OrderView};
use crate::domain::search::OrderSearch;
use crate::errors::AppError;

const SEARCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub id: OrderId,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OwnerResponse {
    pub id: i32,
    pub nickname: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: i32,
    pub name: String,
    pub manufacturer: String,
    pub quantity: i32,
    /// Unit price captured when the order was placed, as a decimal string.
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub date: String,
    pub status: String,
    pub total_price: String,
    pub owner: OwnerResponse,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        Self {
            order_id: order.id,
            date: order.date.to_rfc3339(),
            status: order.status.to_string(),
            total_price: order.total_price.to_string(),
            owner: OwnerResponse {
                id: order.owner.id,
                nickname: order.owner.nickname,
                role: order.owner.role,
            },
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    id: l.product_id,
                    name: l.name,
                    manufacturer: l.manufacturer,
                    quantity: l.quantity,
                    unit_price: l.unit_price.to_string(),
                    line_total: l.line_total.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    /// Either "confirmed" or "rejected".
    pub status: String,
}

/// Search filters. Empty values are ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Range start, `YYYY-MM-DD HH:MM:SS` UTC. Requires `timeend`.
    pub timestart: Option<String>,
    /// Range end (exclusive), `YYYY-MM-DD HH:MM:SS` UTC.
    pub timeend: Option<String>,
    pub userid: Option<String>,
    /// One of created, confirmed, rejected.
    pub status: Option<String>,
    pub productid: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_time(name: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    present(raw)
        .map(|v| {
            NaiveDateTime::parse_from_str(&v, SEARCH_TIME_FORMAT)
                .map(|t| t.and_utc())
                .map_err(|_| AppError::BadRequest(format!("{name} is not a valid date")))
        })
        .transpose()
}

fn parse_id(name: &str, raw: Option<String>) -> Result<Option<i32>, AppError> {
    present(raw)
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::BadRequest(format!("{name} is not a valid id")))
        })
        .transpose()
}

impl SearchParams {
    pub fn into_filter(self) -> Result<OrderSearch, AppError> {
        let status = present(self.status)
            .map(|s| OrderStatus::from_str(&s))
            .transpose()?;
        Ok(OrderSearch::new(
            parse_time("timestart", self.timestart)?,
            parse_time("timeend", self.timeend)?,
            parse_id("userid", self.userid)?,
            status,
            parse_id("productid", self.productid)?,
        )?)
    }
}

fn into_responses(orders: Vec<OrderView>) -> Vec<OrderResponse> {
    orders.into_iter().map(OrderResponse::from).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /cart/buy
///
/// Turns the caller's cart into a `created` order. Stock is checked but not
/// reserved; the cart is emptied and its cookie dropped.
#[utoipa::path(
    post,
    path = "/cart/buy",
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Cart is empty"),
        (status = 401, description = "No valid session"),
        (status = 406, description = "A product is unavailable in the requested quantity"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let session = session(&req)?;
    let cart = cookie_value(&req, CART_COOKIE)
        .ok_or_else(|| AppError::BadRequest("nothing to order".to_string()))?;

    let order_id = web::block(move || state.workflow.create_order(&session, &cart)).await??;

    let mut expired = Cookie::build(CART_COOKIE, "").path("/").finish();
    expired.make_removal();
    Ok(HttpResponse::Created()
        .cookie(expired)
        .json(CreateOrderResponse { id: order_id }))
}

/// GET /orders
///
/// Lists the caller's own orders, oldest first.
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Caller's orders", body = Vec<OrderResponse>),
        (status = 401, description = "No valid session"),
        (status = 404, description = "The caller has no orders"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn current_user_orders<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let session = session(&req)?;
    let orders = web::block(move || state.workflow.current_user_orders(&session)).await??;
    Ok(HttpResponse::Ok().json(into_responses(orders)))
}

/// GET /orders/search
///
/// Manager-only conjunctive search over date range, owner, status and
/// product.
#[utoipa::path(
    get,
    path = "/orders/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching orders", body = Vec<OrderResponse>),
        (status = 400, description = "Malformed filter"),
        (status = 401, description = "Caller is not a manager"),
        (status = 404, description = "No order matches"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn search_orders<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
    query: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    require_manager(&state, &req).await?;
    let filter = query.into_inner().into_filter()?;

    let orders = web::block(move || state.workflow.search_orders(&filter)).await??;
    Ok(HttpResponse::Ok().json(into_responses(orders)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = i32, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 401, description = "Caller is not a manager"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
    path: web::Path<OrderId>,
) -> Result<HttpResponse, AppError> {
    require_manager(&state, &req).await?;
    let order_id = path.into_inner();

    let order = web::block(move || state.workflow.get_order(order_id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/update
///
/// Confirms (committing stock) or rejects a `created` order.
#[utoipa::path(
    post,
    path = "/orders/{id}/update",
    params(
        ("id" = i32, Path, description = "Order id"),
    ),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Target status is not confirmed or rejected"),
        (status = 401, description = "Caller is not a manager"),
        (status = 404, description = "Order not found"),
        (status = 406, description = "Order is not created, or stock is insufficient"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn set_order_status<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
    path: web::Path<OrderId>,
    body: web::Json<SetStatusRequest>,
) -> Result<HttpResponse, AppError> {
    require_manager(&state, &req).await?;
    let order_id = path.into_inner();
    let status = OrderStatus::from_str(&body.status)?;

    web::block(move || state.workflow.set_order_status(order_id, status)).await??;
    Ok(HttpResponse::Ok().finish())
}

/// POST /orders/{id}/cancel
///
/// Owner cancellation within the cancellation window.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = i32, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order cancelled"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "No such order owned by the caller"),
        (status = 406, description = "Window expired or order already processed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn cancel_order<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
    path: web::Path<OrderId>,
) -> Result<HttpResponse, AppError> {
    let session = session(&req)?;
    let order_id = path.into_inner();

    web::block(move || state.workflow.cancel_order(order_id, &session)).await??;
    Ok(HttpResponse::Ok().finish())
}
