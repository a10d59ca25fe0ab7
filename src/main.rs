use actix_web::web;
use dotenvy::dotenv;
use storefront::{
    build_server, create_pool, create_redis_pool, run_migrations, AppConfig, AppState,
    StartupError,
};

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url)?;
    run_migrations(&pool)?;
    let redis = create_redis_pool(&config.redis_url)?;

    let state = web::Data::new(AppState::new(pool, redis, &config));

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await?;
    Ok(())
}
