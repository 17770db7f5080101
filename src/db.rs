use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type RedisPool = r2d2::Pool<redis::Client>;

pub fn create_pool(database_url: &str) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("invalid redis url: {0}")]
    Url(#[from] redis::RedisError),
    #[error("redis pool: {0}")]
    Pool(#[from] r2d2::Error),
}

pub fn create_redis_pool(redis_url: &str) -> Result<RedisPool, RedisPoolError> {
    let client = redis::Client::open(redis_url)?;
    let pool = r2d2::Pool::builder()
        .connection_timeout(Duration::from_secs(5))
        .build(client)?;
    Ok(pool)
}
