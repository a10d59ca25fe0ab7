use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

use crate::errors::StartupError;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Redis connections for the cart and session stores.
pub type RedisPool = Pool<redis::Client>;

pub fn create_pool(database_url: &str) -> Result<DbPool, StartupError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Ok(Pool::builder().build(manager)?)
}

pub fn create_redis_pool(redis_url: &str) -> Result<RedisPool, StartupError> {
    let client = redis::Client::open(redis_url)?;
    Ok(Pool::builder().build(client)?)
}
