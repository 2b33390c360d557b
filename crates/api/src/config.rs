//! Application configuration loaded from environment variables.

use common::Money;
use secrecy::SecretString;
use thiserror::Error;

/// Webhook secret used when `PAYMENT_WEBHOOK_SECRET` is unset.
pub const LOCAL_WEBHOOK_SECRET: &str = "whsec_local_development";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Cannot build distributor client: {0}")]
    DistributorClient(String),
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`, `RUST_LOG`: bind address, listen port, tracing filter
/// - `DISTRIBUTOR_BASE_URL`, `DISTRIBUTOR_API_KEY`: real distributor; unset
///   means the in-memory one
/// - `PAYMENT_WEBHOOK_SECRET`, `WEBHOOK_TOLERANCE_SECS`
/// - `FREE_SHIPPING_THRESHOLD_CENTS`, `TAX_RATE_BPS`
/// - `DEFAULT_WAREHOUSE`, `DEFAULT_PAYMENT_TYPE`, `PO_PREFIX`
/// - `ORDER_TEST_MODE`: only `true` or `1` turn it on
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub distributor_base_url: Option<String>,
    pub distributor_api_key: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub webhook_tolerance_secs: i64,
    pub free_shipping_threshold: Money,
    pub tax_rate_bps: u32,
    pub warehouse: String,
    pub payment_type: String,
    pub po_prefix: String,
    pub order_test_mode: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let distributor_base_url = get("DISTRIBUTOR_BASE_URL");
        let distributor_api_key = get("DISTRIBUTOR_API_KEY").map(SecretString::from);
        if distributor_base_url.is_some() && distributor_api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("DISTRIBUTOR_API_KEY".to_string()));
        }

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse(&get, "PORT")?.unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            distributor_base_url,
            distributor_api_key,
            webhook_secret: get("PAYMENT_WEBHOOK_SECRET").map(SecretString::from),
            webhook_tolerance_secs: parse(&get, "WEBHOOK_TOLERANCE_SECS")?
                .unwrap_or(defaults.webhook_tolerance_secs),
            free_shipping_threshold: parse(&get, "FREE_SHIPPING_THRESHOLD_CENTS")?
                .map(Money::from_cents)
                .unwrap_or(defaults.free_shipping_threshold),
            tax_rate_bps: parse(&get, "TAX_RATE_BPS")?.unwrap_or(defaults.tax_rate_bps),
            warehouse: get("DEFAULT_WAREHOUSE").unwrap_or(defaults.warehouse),
            payment_type: get("DEFAULT_PAYMENT_TYPE").unwrap_or(defaults.payment_type),
            po_prefix: get("PO_PREFIX").unwrap_or(defaults.po_prefix),
            order_test_mode: get("ORDER_TEST_MODE")
                .is_some_and(|v| matches!(v.trim(), "true" | "1")),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            distributor_base_url: None,
            distributor_api_key: None,
            webhook_secret: None,
            webhook_tolerance_secs: 300,
            free_shipping_threshold: Money::from_cents(9900),
            tax_rate_bps: 0,
            warehouse: "main".to_string(),
            payment_type: "credit_card".to_string(),
            po_prefix: "WEB".to_string(),
            order_test_mode: false,
        }
    }
}
