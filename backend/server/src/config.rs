use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:5000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(format!("unknown document store `{other}`, expected memory or redis")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub store: StoreBackend,
    pub redis_url: String,
    pub redis_prefix: String,
    pub identity_api_url: String,
    pub identity_api_key: Option<String>,
    pub payment_api_url: String,
    pub payment_access_token: Option<String>,
    pub payment_timeout: Duration,
    /// Public base URL the payment provider calls back on, usually a tunnel.
    pub notification_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            allowed_origins: split_list(DEFAULT_ORIGINS),
            store: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_prefix: "rastreando".to_string(),
            identity_api_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            identity_api_key: None,
            payment_api_url: "https://api.mercadopago.com".to_string(),
            payment_access_token: None,
            payment_timeout: Duration::from_millis(5000),
            notification_base_url: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config = Self {
            port: try_load("RUST_PORT", "5000")?,
            allowed_origins: split_list(&try_load::<String>("ALLOWED_ORIGINS", DEFAULT_ORIGINS)?),
            store: try_load("DOCUMENT_STORE", "memory")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            redis_prefix: try_load("REDIS_PREFIX", "rastreando")?,
            identity_api_url: try_load(
                "IDENTITY_API_URL",
                "https://identitytoolkit.googleapis.com/v1",
            )?,
            identity_api_key: read_secret("IDENTITY_API_KEY"),
            payment_api_url: try_load("PAYMENT_API_URL", "https://api.mercadopago.com")?,
            payment_access_token: read_secret("MERCADO_PAGO_ACCESS_TOKEN"),
            payment_timeout: Duration::from_millis(try_load("PAYMENT_TIMEOUT_MS", "5000")?),
            notification_base_url: optional_var("NOTIFICATION_BASE_URL"),
        };

        if config.allowed_origins.is_empty() {
            return Err(anyhow!("ALLOWED_ORIGINS must list at least one origin"));
        }

        Ok(config)
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
        .context("Environment misconfigured")
}

/// Unset and blank values both count as absent.
fn optional_var(key: &str) -> Option<String> {
    var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Environment first, then a mounted secret file.
fn read_secret(secret_name: &str) -> Option<String> {
    if let Ok(value) = env::var(secret_name) {
        return Some(value.trim().to_string());
    }

    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
