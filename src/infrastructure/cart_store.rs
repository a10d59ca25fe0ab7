use std::collections::HashMap;

use redis::Commands;

use crate::db::RedisPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartStore;

impl From<redis::RedisError> for DomainError {
    fn from(e: redis::RedisError) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// Carts as Redis hashes: `cart_<user_id>` maps item id -> quantity.
#[derive(Clone)]
pub struct RedisCartStore {
    pool: RedisPool,
}

impl RedisCartStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

pub fn cart_key(user_id: i64) -> String {
    format!("cart_{}", user_id)
}

impl CartStore for RedisCartStore {
    fn get(&self, user_id: i64, item_id: i64) -> Result<Option<i32>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(conn.hget(cart_key(user_id), item_id)?)
    }

    fn set(&self, user_id: i64, item_id: i64, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        conn.hset::<_, _, _, ()>(cart_key(user_id), item_id, quantity)?;
        Ok(())
    }

    fn delete(&self, user_id: i64, item_ids: &[i64]) -> Result<(), DomainError> {
        if item_ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get()?;
        conn.hdel::<_, _, ()>(cart_key(user_id), item_ids)?;
        Ok(())
    }

    fn all(&self, user_id: i64) -> Result<HashMap<i64, i32>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(conn.hgetall(cart_key(user_id))?)
    }

    fn count(&self, user_id: i64) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(conn.hlen(cart_key(user_id))?)
    }

    fn total_quantity(&self, user_id: i64) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;
        let quantities: Vec<i64> = conn.hvals(cart_key(user_id))?;
        Ok(quantities.into_iter().sum())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{cart_key, RedisCartStore};
    use crate::domain::ports::CartStore;
    use crate::infrastructure::testing::setup_redis;

    #[test]
    fn cart_key_is_namespaced_by_user() {
        assert_eq!(cart_key(42), "cart_42");
    }

    #[tokio::test]
    async fn stores_quantities_per_user() {
        let (_container, pool) = setup_redis().await;
        let carts = RedisCartStore::new(pool);

        carts.set(1, 7, 2).unwrap();
        carts.set(1, 9, 5).unwrap();
        carts.set(2, 7, 1).unwrap();

        assert_eq!(carts.get(1, 7).unwrap(), Some(2));
        assert_eq!(carts.get(1, 11).unwrap(), None);
        assert_eq!(carts.all(1).unwrap(), HashMap::from([(7, 2), (9, 5)]));
        assert_eq!(carts.count(1).unwrap(), 2);
        assert_eq!(carts.total_quantity(1).unwrap(), 7);
        assert_eq!(carts.count(2).unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_tolerates_absent_items() {
        let (_container, pool) = setup_redis().await;
        let carts = RedisCartStore::new(pool);
        carts.set(1, 7, 2).unwrap();

        carts.delete(1, &[7, 9]).expect("partial delete");
        carts.delete(1, &[7, 9]).expect("repeat delete");
        carts.delete(3, &[1]).expect("delete from empty cart");
        carts.delete(1, &[]).expect("empty delete");

        assert_eq!(carts.count(1).unwrap(), 0);
        assert_eq!(carts.total_quantity(1).unwrap(), 0);
    }
}
