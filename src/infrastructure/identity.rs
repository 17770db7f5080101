use std::collections::HashMap;

use redis::Commands;

use crate::db::RedisPool;
use crate::domain::errors::DomainError;
use crate::domain::order::Identity;
use crate::domain::ports::IdentityLookup;

/// Reads sessions written by the sign-in flow: a hash with `userId` and
/// `role` fields keyed by the raw session handle.
pub struct RedisIdentityLookup {
    pool: RedisPool,
}

impl RedisIdentityLookup {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

impl IdentityLookup for RedisIdentityLookup {
    fn resolve(&self, session: &str) -> Result<Option<Identity>, DomainError> {
        if session.is_empty() {
            return Ok(None);
        }
        let mut conn = self.pool.get()?;
        let fields: HashMap<String, String> = conn.hgetall(session)?;
        if fields.is_empty() {
            return Ok(None);
        }
        let user_id = fields
            .get("userId")
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| DomainError::server(format!("session {session} has no valid userId")))?;
        let role = fields.get("role").cloned().unwrap_or_default();
        Ok(Some(Identity { user_id, role }))
    }
}
