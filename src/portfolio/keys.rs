//! Well-known result keys.
//!
//! Producers publish under [`ResultKey::NAME`] and consumers read back through
//! [`read`], so the cache key and the shape of the value are tied together by
//! the type system instead of by convention.

use std::collections::HashMap;

use serde::Serialize;

use crate::portfolio::AssetReturn;
use crate::worker::ResultCache;

/// Values produced by the portfolio jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PriceData {
    /// Current gold price in the configured currency
    Gold(f32),
    /// Current price by stock ticker
    Stocks(HashMap<String, f32>),
    /// Per-asset P&L snapshot recorded by the daily run
    DailyReturns(Vec<AssetReturn>),
}

/// A named slot in the result cache with a fixed value shape.
pub trait ResultKey {
    /// Cache key, also used as the task name.
    const NAME: &'static str;

    type Value: Clone;

    fn wrap(value: Self::Value) -> PriceData;

    fn extract(data: &PriceData) -> Option<Self::Value>;
}

pub struct GoldPrice;

impl ResultKey for GoldPrice {
    const NAME: &'static str = "goldPrice";
    type Value = f32;

    fn wrap(value: f32) -> PriceData {
        PriceData::Gold(value)
    }

    fn extract(data: &PriceData) -> Option<f32> {
        match data {
            PriceData::Gold(price) => Some(*price),
            _ => None,
        }
    }
}

pub struct StockPrices;

impl ResultKey for StockPrices {
    const NAME: &'static str = "stockPrice";
    type Value = HashMap<String, f32>;

    fn wrap(value: HashMap<String, f32>) -> PriceData {
        PriceData::Stocks(value)
    }

    fn extract(data: &PriceData) -> Option<HashMap<String, f32>> {
        match data {
            PriceData::Stocks(prices) => Some(prices.clone()),
            _ => None,
        }
    }
}

pub struct DailyReturns;

impl ResultKey for DailyReturns {
    const NAME: &'static str = "dailyReturn";
    type Value = Vec<AssetReturn>;

    fn wrap(value: Vec<AssetReturn>) -> PriceData {
        PriceData::DailyReturns(value)
    }

    fn extract(data: &PriceData) -> Option<Vec<AssetReturn>> {
        match data {
            PriceData::DailyReturns(snapshot) => Some(snapshot.clone()),
            _ => None,
        }
    }
}

/// Reads the value stored under `K`.
///
/// Absent, expired, failed and wrongly shaped results all read as `None`.
pub async fn read<K: ResultKey>(cache: &ResultCache<PriceData>) -> Option<K::Value> {
    let result = cache.get(K::NAME).await?;
    result.value().and_then(K::extract)
}
