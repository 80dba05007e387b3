//! Price source contract used by the refresh jobs.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("no gold price available in {0}")]
    GoldUnavailable(String),

    #[error("no price available for ticker {0}")]
    TickerUnavailable(String),

    #[error("price source failed: {0}")]
    Source(String),
}

/// Current market prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Price of one unit of gold in `currency`.
    async fn gold_price(&self, currency: &str) -> Result<f32, FetchError>;

    async fn stock_price(&self, ticker: &str) -> Result<f32, FetchError>;
}

/// Price source answering from a fixed table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StaticPriceSource {
    /// Gold price keyed by currency code
    #[serde(default)]
    pub gold: HashMap<String, f32>,
    /// Stock price keyed by ticker
    #[serde(default)]
    pub stocks: HashMap<String, f32>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gold(mut self, currency: &str, price: f32) -> Self {
        self.gold.insert(currency.to_string(), price);
        self
    }

    pub fn with_stock(mut self, ticker: &str, price: f32) -> Self {
        self.stocks.insert(ticker.to_string(), price);
        self
    }

    /// Loads `{"gold": {"EUR": ...}, "stocks": {"AAPL": ...}}` from disk.
    pub async fn from_json_file(path: &Path) -> Result<Self, FetchError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|err| FetchError::Source(format!("{}: {}", path.display(), err)))?;
        serde_json::from_slice(&raw).map_err(|err| FetchError::Source(err.to_string()))
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn gold_price(&self, currency: &str) -> Result<f32, FetchError> {
        self.gold
            .get(currency)
            .copied()
            .ok_or_else(|| FetchError::GoldUnavailable(currency.to_string()))
    }

    async fn stock_price(&self, ticker: &str) -> Result<f32, FetchError> {
        self.stocks
            .get(ticker)
            .copied()
            .ok_or_else(|| FetchError::TickerUnavailable(ticker.to_string()))
    }
}
