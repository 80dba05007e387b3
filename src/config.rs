//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::portfolio::CatalogSettings;
use crate::worker::{DEFAULT_QUEUE_CAPACITY, DEFAULT_RESULT_TTL};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Durations are given in seconds.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of queued tasks before producers wait
    pub queue_capacity: usize,
    /// Result lifetime for tasks that do not set their own TTL
    pub result_ttl: u64,
    /// Interval between background sweeps of expired cache entries
    pub sweep_interval: u64,
    /// How long shutdown waits for the worker queue to drain
    pub shutdown_timeout: u64,
    /// Period of the gold and stock price refresh
    pub price_refresh_interval: u64,
    /// Lifetime of cached prices
    pub price_ttl: u64,
    /// Period of the total returns computation
    pub returns_interval: u64,
    /// Lifetime of the cached total returns
    pub returns_ttl: u64,
    /// Currency the gold price is fetched in
    pub gold_currency: String,
    /// Optional JSON array of assets to seed the repository with
    pub assets_file: Option<PathBuf>,
    /// Optional JSON price table for the static price source
    pub prices_file: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `QUEUE_CAPACITY` - Worker queue capacity (default: 100)
    /// - `RESULT_TTL` - Default task result TTL (default: 600)
    /// - `SWEEP_INTERVAL` - Cache sweep frequency (default: 5)
    /// - `SHUTDOWN_TIMEOUT` - Worker drain timeout (default: 30)
    /// - `PRICE_REFRESH_INTERVAL` - Price refresh period (default: 1860)
    /// - `PRICE_TTL` - Cached price lifetime (default: 1740)
    /// - `RETURNS_INTERVAL` - Total returns period (default: 86400)
    /// - `RETURNS_TTL` - Cached total returns lifetime (default: 600)
    /// - `GOLD_CURRENCY` - Gold price currency (default: EUR)
    /// - `ASSETS_FILE` - Asset seed file (default: none)
    /// - `PRICES_FILE` - Price table file (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            queue_capacity: parse_var("QUEUE_CAPACITY").unwrap_or(defaults.queue_capacity),
            result_ttl: parse_var("RESULT_TTL").unwrap_or(defaults.result_ttl),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            shutdown_timeout: parse_var("SHUTDOWN_TIMEOUT").unwrap_or(defaults.shutdown_timeout),
            price_refresh_interval: parse_var("PRICE_REFRESH_INTERVAL")
                .unwrap_or(defaults.price_refresh_interval),
            price_ttl: parse_var("PRICE_TTL").unwrap_or(defaults.price_ttl),
            returns_interval: parse_var("RETURNS_INTERVAL").unwrap_or(defaults.returns_interval),
            returns_ttl: parse_var("RETURNS_TTL").unwrap_or(defaults.returns_ttl),
            gold_currency: env::var("GOLD_CURRENCY").unwrap_or(defaults.gold_currency),
            assets_file: env::var_os("ASSETS_FILE").map(PathBuf::from),
            prices_file: env::var_os("PRICES_FILE").map(PathBuf::from),
        }
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// Schedule and lifetime settings for the portfolio tasks.
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            gold_currency: self.gold_currency.clone(),
            price_refresh_interval: Duration::from_secs(self.price_refresh_interval.max(1)),
            price_ttl: Duration::from_secs(self.price_ttl),
            returns_interval: Duration::from_secs(self.returns_interval.max(1)),
            returns_ttl: Duration::from_secs(self.returns_ttl),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            result_ttl: DEFAULT_RESULT_TTL.as_secs(),
            sweep_interval: 5,
            shutdown_timeout: 30,
            price_refresh_interval: 31 * 60,
            price_ttl: 29 * 60,
            returns_interval: 24 * 60 * 60,
            returns_ttl: 600,
            gold_currency: "EUR".to_string(),
            assets_file: None,
            prices_file: None,
        }
    }
}
