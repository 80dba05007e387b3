//! Background jobs refreshing prices and returns, and the catalogue of tasks
//! built from them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::portfolio::{
    AssetKind, AssetRepository, DailyReturns, GoldPrice, HistoricReturns, PriceData, PriceSource,
    ResultKey, StockPrices,
};
use crate::worker::{Job, JobError, Task};

/// Fetches the gold price in `currency`.
pub fn fetch_gold_job(source: Arc<dyn PriceSource>, currency: String) -> Job<PriceData> {
    Job::new(move |_ctx| {
        let source = Arc::clone(&source);
        let currency = currency.clone();
        async move {
            let price = source.gold_price(&currency).await.map_err(JobError::failed)?;
            Ok(GoldPrice::wrap(price))
        }
    })
}

/// Fetches the current price of every stock held. Any missing price fails the
/// whole job so consumers never see a partial price map.
pub fn fetch_stocks_job(
    assets: Arc<dyn AssetRepository>,
    source: Arc<dyn PriceSource>,
) -> Job<PriceData> {
    Job::new(move |ctx| {
        let assets = Arc::clone(&assets);
        let source = Arc::clone(&source);
        async move {
            let stocks = assets
                .assets_by_kind(AssetKind::Stock)
                .await
                .map_err(JobError::failed)?;

            let mut prices = HashMap::new();
            for ticker in stocks.into_iter().filter_map(|stock| stock.ticker) {
                if ctx.is_cancelled() {
                    return Err(JobError::failed("stock refresh cancelled"));
                }
                if prices.contains_key(&ticker) {
                    continue;
                }
                let price = source.stock_price(&ticker).await.map_err(JobError::failed)?;
                prices.insert(ticker, price);
            }
            Ok(StockPrices::wrap(prices))
        }
    })
}

/// Records today's per-asset P&L in the return history. The stored result is
/// the snapshot that was recorded.
pub fn record_returns_job(history: HistoricReturns) -> Job<PriceData> {
    Job::new(move |ctx| {
        let history = history.clone();
        async move {
            if ctx.is_cancelled() {
                return Err(JobError::failed("return snapshot cancelled"));
            }
            let snapshot = history.record().await.map_err(JobError::failed)?;
            Ok(DailyReturns::wrap(snapshot))
        }
    })
}

/// A task together with how often the scheduler submits it.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub task: Task<PriceData>,
    pub every: Duration,
}

/// Settings for [`TaskCatalog::new`].
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub gold_currency: String,
    pub price_refresh_interval: Duration,
    pub price_ttl: Duration,
    pub returns_interval: Duration,
    pub returns_ttl: Duration,
}

/// Every task the application knows how to run, by task name.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: HashMap<String, ScheduledTask>,
}

impl TaskCatalog {
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        source: Arc<dyn PriceSource>,
        history: HistoricReturns,
        settings: &CatalogSettings,
    ) -> Self {
        let gold = Task::new(
            GoldPrice::NAME,
            fetch_gold_job(Arc::clone(&source), settings.gold_currency.clone()),
        )
        .with_ttl(settings.price_ttl);
        let stocks = Task::new(StockPrices::NAME, fetch_stocks_job(assets, source))
            .with_ttl(settings.price_ttl);
        let returns = Task::new(DailyReturns::NAME, record_returns_job(history))
            .with_ttl(settings.returns_ttl);

        Self::default()
            .with(gold, settings.price_refresh_interval)
            .with(stocks, settings.price_refresh_interval)
            .with(returns, settings.returns_interval)
    }

    pub fn with(mut self, task: Task<PriceData>, every: Duration) -> Self {
        self.tasks
            .insert(task.name.clone(), ScheduledTask { task, every });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScheduledTask> {
        self.tasks.get(name)
    }

    /// Scheduled tasks ordered by name.
    pub fn scheduled(&self) -> Vec<ScheduledTask> {
        let mut scheduled: Vec<_> = self.tasks.values().cloned().collect();
        scheduled.sort_by(|a, b| a.task.name.cmp(&b.task.name));
        scheduled
    }

    pub fn names(&self) -> Vec<String> {
        self.scheduled().into_iter().map(|s| s.task.name).collect()
    }
}
