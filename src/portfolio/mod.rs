//! Portfolio Module
//!
//! The finance side of the application: assets, price sources, the jobs that
//! keep cached prices fresh, the returns calculations that read them, and
//! the daily return history.

pub mod assets;
mod history;
mod jobs;
mod keys;
mod prices;
mod returns;

pub use assets::{
    Asset, AssetKind, AssetRepository, Compounding, InMemoryAssetRepository, RepositoryError,
};
pub use history::{
    monthly_summary, AssetReturn, HistoricReturns, InMemoryReturnHistory, MonthlyReturn,
    ReturnHistoryRepository,
};
pub use jobs::{
    fetch_gold_job, fetch_stocks_job, record_returns_job, CatalogSettings, ScheduledTask,
    TaskCatalog,
};
pub use keys::{read, DailyReturns, GoldPrice, PriceData, ResultKey, StockPrices};
pub use prices::{FetchError, PriceSource, StaticPriceSource};
pub use returns::{ReturnsCalculator, ReturnsError, GOLD_BRANCH, SAVINGS_BRANCH, STOCKS_BRANCH};
