//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
/// - `SESSION_NAMESPACE`: session key namespace (default: `"chat"`)
/// - `SESSION_TTL_SECS`: idle expiry for in-memory sessions (default: none)
/// - `CATALOG_PAGE_SIZE`: items per catalog page (default: `6`)
/// - `BROADCAST_INTERVAL_SECS`: promo scheduler period (default: `60`)
/// - `BROADCAST_BATCH_SIZE`: users notified together (default: `50`)
/// - `NOTIFY_TIMEOUT_SECS`: bound on one promo delivery (default: `10`)
/// - `CLEAR_CART_ON_PAYMENT`: empty the cart after a paid order (default: `true`)
/// - `CURRENCY`: invoice currency (default: `"RUB"`)
/// - `OUTBOUND_URL`: endpoint receiving promo deliveries; logged only when unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub session_namespace: String,
    pub session_ttl: Option<Duration>,
    pub catalog_page_size: usize,
    pub broadcast_interval: Duration,
    pub broadcast_batch_size: usize,
    pub notify_timeout: Duration,
    pub clear_cart_on_payment: bool,
    pub currency: String,
    pub outbound_url: Option<String>,
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty("DATABASE_URL"),
            session_namespace: non_empty("SESSION_NAMESPACE")
                .unwrap_or(defaults.session_namespace),
            session_ttl: parsed::<u64>("SESSION_TTL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            catalog_page_size: parsed::<usize>("CATALOG_PAGE_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.catalog_page_size),
            broadcast_interval: parsed::<u64>("BROADCAST_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.broadcast_interval),
            broadcast_batch_size: parsed::<usize>("BROADCAST_BATCH_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.broadcast_batch_size),
            notify_timeout: parsed::<u64>("NOTIFY_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.notify_timeout),
            clear_cart_on_payment: std::env::var("CLEAR_CART_ON_PAYMENT")
                .ok()
                .and_then(|v| flag(&v))
                .unwrap_or(defaults.clear_cart_on_payment),
            currency: non_empty("CURRENCY").unwrap_or(defaults.currency),
            outbound_url: non_empty("OUTBOUND_URL"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            session_namespace: "chat".to_string(),
            session_ttl: None,
            catalog_page_size: domain::DEFAULT_PAGE_SIZE,
            broadcast_interval: broadcast::scheduler::DEFAULT_INTERVAL,
            broadcast_batch_size: broadcast::job::DEFAULT_BATCH_SIZE,
            notify_timeout: broadcast::job::DEFAULT_NOTIFY_TIMEOUT,
            clear_cart_on_payment: true,
            currency: "RUB".to_string(),
            outbound_url: None,
        }
    }
}
