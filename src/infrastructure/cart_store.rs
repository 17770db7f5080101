use std::time::Duration;

use redis::{Commands, ErrorKind, RedisError};

use crate::db::RedisPool;
use crate::domain::cart::Cart;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartStore;

pub const DEFAULT_CART_TTL: Duration = Duration::from_secs(24 * 60 * 60);

impl From<RedisError> for DomainError {
    fn from(e: RedisError) -> Self {
        log::error!("redis error: {e}");
        DomainError::ServerError(e.to_string())
    }
}

/// Carts stored as JSON strings under `cart:<handle>`, expiring `ttl` after
/// the last write.
pub struct RedisCartStore {
    pool: RedisPool,
    ttl: Duration,
}

impl RedisCartStore {
    pub fn new(pool: RedisPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    fn key(handle: &str) -> String {
        format!("cart:{handle}")
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

fn decode(raw: Option<String>) -> Result<Cart, serde_json::Error> {
    match raw {
        Some(raw) => serde_json::from_str(&raw),
        None => Ok(Cart::default()),
    }
}

fn payload_error(e: serde_json::Error) -> RedisError {
    RedisError::from((ErrorKind::TypeError, "cart payload", e.to_string()))
}

impl CartStore for RedisCartStore {
    fn get(&self, handle: &str) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;
        let raw: Option<String> = conn.get(Self::key(handle))?;
        Ok(decode(raw)?)
    }

    fn set(&self, handle: &str, cart: &Cart) -> Result<(), DomainError> {
        let payload = serde_json::to_string(cart)?;
        let mut conn = self.pool.get()?;
        let _: () = conn.set_ex(Self::key(handle), payload, self.ttl_secs())?;
        Ok(())
    }

    /// WATCH/MULTI/EXEC loop: the transform is re-run whenever another writer
    /// touched the key between the read and the commit.
    fn update(&self, handle: &str, mutate: &dyn Fn(&mut Cart)) -> Result<Cart, DomainError> {
        let key = Self::key(handle);
        let ttl = self.ttl_secs();
        let mut conn = self.pool.get()?;

        let mut updated = Cart::default();
        let _: () = redis::transaction(&mut *conn, &[&key], |conn, pipe| {
            let raw: Option<String> = conn.get(&key)?;
            let mut cart = decode(raw).map_err(payload_error)?;
            mutate(&mut cart);
            let payload = serde_json::to_string(&cart).map_err(payload_error)?;
            updated = cart;
            pipe.set_ex(&key, payload, ttl).ignore().query(conn)
        })?;
        Ok(updated)
    }

    fn delete(&self, handle: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let _: () = conn.del(Self::key(handle))?;
        Ok(())
    }
}
