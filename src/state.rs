use crate::application::cart_service::CartService;
use crate::application::order_service::OrderService;
use crate::config::AppConfig;
use crate::db::{DbPool, RedisPool};
use crate::infrastructure::cart_store::RedisCartStore;
use crate::infrastructure::catalog_repo::DieselCatalog;
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::session_store::RedisSessionStore;

/// Services shared by every worker, handed to handlers as `web::Data`.
pub struct AppState {
    pub orders: OrderService<DieselOrderRepository, RedisCartStore, DieselCatalog>,
    pub carts: CartService<RedisCartStore, DieselCatalog>,
    pub sessions: RedisSessionStore,
}

impl AppState {
    pub fn new(pool: DbPool, redis: RedisPool, config: &AppConfig) -> Self {
        let cart = RedisCartStore::new(redis.clone());
        Self {
            orders: OrderService::new(
                DieselOrderRepository::new(pool.clone()),
                cart.clone(),
                DieselCatalog::new(pool.clone()),
                config.shipping_fee.clone(),
                config.payment.clone(),
            ),
            carts: CartService::new(cart, DieselCatalog::new(pool)),
            sessions: RedisSessionStore::new(redis),
        }
    }
}
