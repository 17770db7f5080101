use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{cookie_value, AppState, Backend, CART_COOKIE};
use crate::domain::cart::CartView;
use crate::domain::order::ProductId;
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    /// Units to add, or to remove (0 removes one).
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItemResponse {
    pub id: ProductId,
    pub name: String,
    pub quantity: i32,
    /// Decimal price as a string, e.g. "9.99"
    pub unit_price: String,
    pub line_total: String,
    pub available: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total_price: String,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            items: view
                .items
                .into_iter()
                .map(|l| CartItemResponse {
                    id: l.product_id,
                    name: l.name,
                    quantity: l.quantity,
                    unit_price: l.unit_price.to_string(),
                    line_total: l.line_total.to_string(),
                    available: l.available,
                })
                .collect(),
            total_price: view.total_price.to_string(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Returns the cart priced at current catalog prices. Without a cart cookie
/// the cart is empty.
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn get_cart<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let Some(handle) = cookie_value(&req, CART_COOKIE) else {
        return Ok(HttpResponse::Ok().json(CartResponse {
            items: vec![],
            total_price: "0".to_string(),
        }));
    };

    let view = web::block(move || state.carts.cart_view(&handle)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(view)))
}

/// POST /cart
///
/// Adds units of a product to the cart, opening a cart session (and setting
/// its cookie) when the caller has none.
#[utoipa::path(
    post,
    path = "/cart",
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Item added"),
        (status = 400, description = "Unknown product or non-positive quantity"),
        (status = 406, description = "Requested quantity is not in stock"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
    body: web::Json<CartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let existing = cookie_value(&req, CART_COOKIE);
    let is_new = existing.is_none();

    let handle = web::block(move || {
        let handle = match existing {
            Some(handle) => handle,
            None => state.carts.create_cart_session()?,
        };
        state
            .carts
            .add_item(&handle, body.product_id, body.quantity)
            .map(|_| handle)
    })
    .await??;

    let mut response = HttpResponse::Ok();
    if is_new {
        response.cookie(Cookie::build(CART_COOKIE, handle).path("/").finish());
    }
    Ok(response.finish())
}

/// DELETE /cart
///
/// Removes units of a product from the cart. Without a cart cookie this is a
/// no-op.
#[utoipa::path(
    delete,
    path = "/cart",
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Item removed"),
        (status = 400, description = "Negative quantity"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn remove_from_cart<B: Backend>(
    state: web::Data<AppState<B>>,
    req: HttpRequest,
    body: web::Json<CartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let Some(handle) = cookie_value(&req, CART_COOKIE) else {
        return Ok(HttpResponse::Ok().finish());
    };

    web::block(move || state.carts.remove_item(&handle, body.product_id, body.quantity)).await??;
    Ok(HttpResponse::Ok().finish())
}
