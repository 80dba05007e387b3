//! Daily per-asset return snapshots and their monthly summary.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::portfolio::returns::accrued_interest;
use crate::portfolio::{Asset, AssetKind, AssetRepository, PriceSource, RepositoryError, ReturnsError};

/// P&L of one asset on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReturn {
    pub asset_id: u64,
    pub date: NaiveDate,
    pub returns: f32,
}

/// First and last recorded P&L of an asset within a calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReturn {
    pub asset_id: u64,
    pub asset_name: String,
    pub year: i32,
    pub month: u32,
    pub first_return: f32,
    pub last_return: f32,
}

/// Append-only storage for return snapshots.
#[async_trait]
pub trait ReturnHistoryRepository: Send + Sync {
    async fn insert_asset_return(&self, entry: AssetReturn) -> Result<(), RepositoryError>;

    /// Every snapshot, in insertion order.
    async fn all_returns(&self) -> Result<Vec<AssetReturn>, RepositoryError>;
}

/// Return history kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryReturnHistory {
    entries: RwLock<Vec<AssetReturn>>,
}

impl InMemoryReturnHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReturnHistoryRepository for InMemoryReturnHistory {
    async fn insert_asset_return(&self, entry: AssetReturn) -> Result<(), RepositoryError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn all_returns(&self) -> Result<Vec<AssetReturn>, RepositoryError> {
        Ok(self.entries.read().await.clone())
    }
}

/// Groups snapshots by asset and calendar month.
///
/// The first return is the one with the earliest date in the month, the last
/// the one with the latest date; on equal dates the earlier insertion is first
/// and the later one last. Snapshots of assets missing from `assets` are
/// dropped. Ordered newest month first, then by asset id.
pub fn monthly_summary(returns: &[AssetReturn], assets: &[Asset]) -> Vec<MonthlyReturn> {
    let names: HashMap<u64, &str> = assets.iter().map(|a| (a.id, a.name.as_str())).collect();

    let mut months: HashMap<(i32, u32, u64), (&AssetReturn, &AssetReturn)> = HashMap::new();
    for entry in returns {
        let key = (entry.date.year(), entry.date.month(), entry.asset_id);
        months
            .entry(key)
            .and_modify(|(first, last)| {
                if entry.date < first.date {
                    *first = entry;
                }
                if entry.date >= last.date {
                    *last = entry;
                }
            })
            .or_insert((entry, entry));
    }

    let mut summary: Vec<MonthlyReturn> = months
        .into_iter()
        .filter_map(|((year, month, asset_id), (first, last))| {
            let asset_name = names.get(&asset_id)?.to_string();
            Some(MonthlyReturn {
                asset_id,
                asset_name,
                year,
                month,
                first_return: first.returns,
                last_return: last.returns,
            })
        })
        .collect();
    summary.sort_by_key(|m| (Reverse(m.year), Reverse(m.month), m.asset_id));
    summary
}

/// Records a P&L snapshot of every asset from live prices and serves the
/// monthly summary of those snapshots.
#[derive(Clone)]
pub struct HistoricReturns {
    assets: Arc<dyn AssetRepository>,
    history: Arc<dyn ReturnHistoryRepository>,
    prices: Arc<dyn PriceSource>,
    gold_currency: String,
}

impl HistoricReturns {
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        history: Arc<dyn ReturnHistoryRepository>,
        prices: Arc<dyn PriceSource>,
        gold_currency: impl Into<String>,
    ) -> Self {
        Self {
            assets,
            history,
            prices,
            gold_currency: gold_currency.into(),
        }
    }

    /// Records today's snapshot. See [`record_at`](Self::record_at).
    pub async fn record(&self) -> Result<Vec<AssetReturn>, ReturnsError> {
        self.record_at(Utc::now().date_naive()).await
    }

    /// Computes the P&L of every asset as of `today` and stores it.
    ///
    /// Stocks and gold are priced from the price source, savings accrue
    /// interest over whole months. Any failure aborts the run before anything
    /// is stored. Savings with no full month elapsed are left out.
    pub async fn record_at(&self, today: NaiveDate) -> Result<Vec<AssetReturn>, ReturnsError> {
        let assets = self.assets.all_assets().await?;

        let mut gold_price = None;
        let mut snapshot = Vec::with_capacity(assets.len());
        for asset in &assets {
            let returns = match asset.kind {
                AssetKind::Stock => {
                    let ticker = asset.ticker.as_deref().unwrap_or_default();
                    let current = self.prices.stock_price(ticker).await?;
                    Some((current - asset.price) * asset.amount)
                }
                AssetKind::Gold => {
                    let current = match gold_price {
                        Some(price) => price,
                        None => {
                            let price = self.prices.gold_price(&self.gold_currency).await?;
                            *gold_price.insert(price)
                        }
                    };
                    Some((current - asset.price) * asset.amount)
                }
                AssetKind::Savings => accrued_interest(asset, today)?,
            };

            if let Some(returns) = returns {
                snapshot.push(AssetReturn {
                    asset_id: asset.id,
                    date: today,
                    returns,
                });
            }
        }

        for entry in &snapshot {
            self.history.insert_asset_return(entry.clone()).await?;
        }
        info!(assets = snapshot.len(), date = %today, "Recorded return snapshot");
        Ok(snapshot)
    }

    /// First and last return per asset per month, newest month first.
    pub async fn monthly_returns(&self) -> Result<Vec<MonthlyReturn>, ReturnsError> {
        let returns = self.history.all_returns().await?;
        let assets = self.assets.all_assets().await?;
        Ok(monthly_summary(&returns, &assets))
    }
}
