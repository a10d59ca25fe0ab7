pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::AppConfig;
pub use db::{create_pool, create_redis_pool, DbPool, RedisPool};
pub use errors::StartupError;
pub use state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::place_order,
        handlers::orders::commit_order,
        handlers::orders::pay_order,
        handlers::orders::confirm_payment,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::cart::add_to_cart,
        handlers::cart::update_cart,
        handlers::cart::delete_from_cart,
        handlers::cart::show_cart,
    ),
    tags(
        (name = "orders", description = "Order commit, payment and history"),
        (name = "cart", description = "Per-user shopping cart"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), StartupError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StartupError::Migration(e.to_string()))?;
    Ok(())
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: web::Data<AppState>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/order")
                    .route("/place", web::post().to(handlers::orders::place_order))
                    .route("/commit", web::post().to(handlers::orders::commit_order))
                    .route("/pay", web::post().to(handlers::orders::pay_order))
                    .route("/confirm", web::post().to(handlers::orders::confirm_payment)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{order_id}", web::get().to(handlers::orders::get_order)),
            )
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::show_cart))
                    .route("/add", web::post().to(handlers::cart::add_to_cart))
                    .route("/update", web::post().to(handlers::cart::update_cart))
                    .route("/delete", web::post().to(handlers::cart::delete_from_cart)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
