use std::env;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::domain::payment::PaymentGateway;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    /// Flat shipping fee charged on every order.
    pub shipping_fee: BigDecimal,
    pub payment: PaymentGateway,
}

impl AppConfig {
    /// Read the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse("PORT", or_default("PORT", "8080"))?;
        let shipping_fee = parse("SHIPPING_FEE", or_default("SHIPPING_FEE", "10.00"))?;

        Ok(Self {
            database_url,
            redis_url: or_default("REDIS_URL", "redis://127.0.0.1:6379/0"),
            host: or_default("HOST", "0.0.0.0"),
            port,
            shipping_fee,
            payment: PaymentGateway {
                gateway_url: or_default(
                    "PAYMENT_GATEWAY_URL",
                    "https://openapi.alipaydev.com/gateway.do",
                ),
                app_id: or_default("PAYMENT_APP_ID", ""),
                store_name: or_default("STORE_NAME", "Daily Fresh"),
            },
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
