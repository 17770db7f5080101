pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::order_workflow::OrderWorkflow;
use config::Config;
use handlers::{ApiDoc, AppState, Backend};
use infrastructure::cart_store::RedisCartStore;
use infrastructure::identity::RedisIdentityLookup;
use infrastructure::inventory_repo::DieselInventoryGateway;
use infrastructure::order_repo::DieselOrderLedger;
use infrastructure::unit_of_work::DieselUnitOfWork;

pub use db::{create_pool, create_redis_pool, DbPool, RedisPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Postgres for inventory and orders, Redis for carts and sessions.
pub struct Production;

impl Backend for Production {
    type Carts = RedisCartStore;
    type Inventory = DieselInventoryGateway;
    type Ledger = DieselOrderLedger;
    type Identities = RedisIdentityLookup;
    type Work = DieselUnitOfWork;
}

pub fn production_state(db: DbPool, redis: RedisPool, config: &Config) -> AppState<Production> {
    let workflow = OrderWorkflow::new(
        RedisCartStore::new(redis.clone(), config.cart_ttl),
        DieselInventoryGateway::new(db.clone()),
        DieselOrderLedger::new(db.clone()),
        RedisIdentityLookup::new(redis.clone()),
        DieselUnitOfWork::new(db.clone()),
    )
    .with_policy(config.cancellation_policy());
    let carts = CartService::new(
        RedisCartStore::new(redis, config.cart_ttl),
        DieselInventoryGateway::new(db),
    );
    AppState::new(workflow, carts)
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server<B: Backend>(
    state: web::Data<AppState<B>>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(handlers::configure::<B>)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
