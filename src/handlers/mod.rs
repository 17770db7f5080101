pub mod cart;
pub mod orders;

use actix_web::{web, HttpRequest};
use utoipa::OpenApi;

use crate::application::cart_service::CartService;
use crate::application::order_workflow::OrderWorkflow;
use crate::domain::order::Identity;
use crate::domain::ports::{CartStore, IdentityLookup, InventoryGateway, OrderLedger, UnitOfWork};
use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "sessionId";
pub const CART_COOKIE: &str = "cartSessionId";

/// The set of adapters a running server is wired with.
pub trait Backend: 'static {
    type Carts: CartStore;
    type Inventory: InventoryGateway + Send + Sync + 'static;
    type Ledger: OrderLedger + Send + Sync + 'static;
    type Identities: IdentityLookup;
    type Work: UnitOfWork;
}

pub struct AppState<B: Backend> {
    pub workflow: OrderWorkflow<B::Carts, B::Inventory, B::Ledger, B::Identities, B::Work>,
    pub carts: CartService<B::Carts, B::Inventory>,
}

impl<B: Backend> AppState<B> {
    pub fn new(
        workflow: OrderWorkflow<B::Carts, B::Inventory, B::Ledger, B::Identities, B::Work>,
        carts: CartService<B::Carts, B::Inventory>,
    ) -> Self {
        Self { workflow, carts }
    }
}

/// Registers every storefront route. Static segments come before `{id}`.
pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .route("", web::get().to(cart::get_cart::<B>))
            .route("", web::post().to(cart::add_to_cart::<B>))
            .route("", web::delete().to(cart::remove_from_cart::<B>))
            .route("/buy", web::post().to(orders::create_order::<B>)),
    )
    .service(
        web::scope("/orders")
            .route("", web::get().to(orders::current_user_orders::<B>))
            .route("/search", web::get().to(orders::search_orders::<B>))
            .route("/{id}", web::get().to(orders::get_order::<B>))
            .route("/{id}/update", web::post().to(orders::set_order_status::<B>))
            .route("/{id}/cancel", web::post().to(orders::cancel_order::<B>)),
    );
}

pub(crate) fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn session(req: &HttpRequest) -> Result<String, AppError> {
    cookie_value(req, SESSION_COOKIE).ok_or(AppError::Unauthorized)
}

/// Resolves the caller and insists on the manager role.
pub(crate) async fn require_manager<B: Backend>(
    state: &web::Data<AppState<B>>,
    req: &HttpRequest,
) -> Result<Identity, AppError> {
    let session = session(req)?;
    let state = state.clone();
    let identity = web::block(move || state.workflow.identify(&session)).await??;
    if !identity.is_manager() {
        log::warn!("user {} is not a manager", identity.user_id);
        return Err(AppError::Unauthorized);
    }
    Ok(identity)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        cart::get_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        orders::create_order,
        orders::current_user_orders,
        orders::search_orders,
        orders::get_order,
        orders::set_order_status,
        orders::cancel_order,
    ),
    components(schemas(
        cart::CartItemRequest,
        cart::CartItemResponse,
        cart::CartResponse,
        orders::CreateOrderResponse,
        orders::OwnerResponse,
        orders::OrderLineResponse,
        orders::OrderResponse,
        orders::SetStatusRequest,
    )),
    tags(
        (name = "cart", description = "Shopping cart"),
        (name = "orders", description = "Order lifecycle"),
    )
)]
pub struct ApiDoc;
