use redis::Commands;

use crate::db::RedisPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::SessionStore;

/// Sessions written by the login flow as `session:<token>` -> user id.
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: RedisPool,
}

impl RedisSessionStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

pub fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

impl SessionStore for RedisSessionStore {
    fn user_for(&self, token: &str) -> Result<Option<i64>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(conn.get(session_key(token))?)
    }
}
