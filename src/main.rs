use std::io;

use actix_web::web;
use dotenvy::dotenv;
use storefront::config::Config;
use storefront::{
    build_server, create_pool, create_redis_pool, production_state, run_migrations,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io::Error::other)?;

    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;
    let redis = create_redis_pool(&config.redis_url).map_err(io::Error::other)?;

    let state = web::Data::new(production_state(pool, redis, &config));

    log::info!("Starting server at http://{}", config.addr());

    build_server(state, &config.host, config.port)?.await
}
