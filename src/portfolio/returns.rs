//! Profit and loss per asset class, computed from cached prices.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use thiserror::Error;

use crate::aggregate::{Aggregate, FanOut};
use crate::portfolio::{
    read, Asset, AssetKind, AssetRepository, FetchError, GoldPrice, PriceData, RepositoryError,
    StockPrices,
};
use crate::worker::ResultCache;

/// Branch names of the returns breakdown.
pub const STOCKS_BRANCH: &str = "stocks";
pub const SAVINGS_BRANCH: &str = "savings";
pub const GOLD_BRANCH: &str = "gold";

#[derive(Error, Debug)]
pub enum ReturnsError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("stock prices not found in cache")]
    StockPricesUnavailable,

    #[error("price for ticker {0} not found in cache")]
    TickerPriceMissing(String),

    #[error("gold price not found in cache")]
    GoldPriceUnavailable,

    #[error("missing required fields in asset {0}")]
    IncompleteSavings(String),

    #[error(transparent)]
    Price(#[from] FetchError),
}

/// Computes returns for every asset class.
///
/// Market prices come from the result cache populated by the refresh jobs;
/// nothing here fetches prices itself.
#[derive(Clone)]
pub struct ReturnsCalculator {
    assets: Arc<dyn AssetRepository>,
    results: ResultCache<PriceData>,
}

impl ReturnsCalculator {
    pub fn new(assets: Arc<dyn AssetRepository>, results: ResultCache<PriceData>) -> Self {
        Self { assets, results }
    }

    /// P&L by ticker, summed over every lot of the same ticker.
    ///
    /// Like the other classes, no holdings means no returns and no price lookup.
    pub async fn stock_returns(&self) -> Result<HashMap<String, f32>, ReturnsError> {
        let stocks = self.assets.assets_by_kind(AssetKind::Stock).await?;
        if stocks.is_empty() {
            return Ok(HashMap::new());
        }

        let prices = read::<StockPrices>(&self.results)
            .await
            .ok_or(ReturnsError::StockPricesUnavailable)?;

        let mut pnl_by_ticker = HashMap::new();
        for stock in stocks {
            let ticker = stock.ticker.unwrap_or_default();
            let current = *prices
                .get(&ticker)
                .ok_or_else(|| ReturnsError::TickerPriceMissing(ticker.clone()))?;
            *pnl_by_ticker.entry(ticker).or_insert(0.0) += (current - stock.price) * stock.amount;
        }
        Ok(pnl_by_ticker)
    }

    /// P&L by gold asset name.
    pub async fn gold_returns(&self) -> Result<HashMap<String, f32>, ReturnsError> {
        let gold = self.assets.assets_by_kind(AssetKind::Gold).await?;
        if gold.is_empty() {
            return Ok(HashMap::new());
        }

        let current = read::<GoldPrice>(&self.results)
            .await
            .ok_or(ReturnsError::GoldPriceUnavailable)?;

        let mut pnl_by_name = HashMap::new();
        for asset in gold {
            *pnl_by_name.entry(asset.name).or_insert(0.0) += (current - asset.price) * asset.amount;
        }
        Ok(pnl_by_name)
    }

    /// Accrued interest by savings asset name, as of today.
    pub async fn interest_returns(&self) -> Result<HashMap<String, f32>, ReturnsError> {
        self.interest_returns_at(Utc::now().date_naive()).await
    }

    /// Accrued interest by savings asset name, as of `today`.
    ///
    /// Assets starting in the future or in the current month are skipped.
    pub async fn interest_returns_at(
        &self,
        today: NaiveDate,
    ) -> Result<HashMap<String, f32>, ReturnsError> {
        let savings = self.assets.assets_by_kind(AssetKind::Savings).await?;

        let mut pnl_by_name = HashMap::new();
        for asset in savings {
            if let Some(interest) = accrued_interest(&asset, today)? {
                pnl_by_name.insert(asset.name, interest);
            }
        }
        Ok(pnl_by_name)
    }

    /// Runs the three asset classes concurrently and keeps whatever succeeds.
    pub async fn returns_breakdown(&self) -> Aggregate<String, f32> {
        let stocks = self.clone();
        let savings = self.clone();
        let gold = self.clone();

        FanOut::new()
            .branch(STOCKS_BRANCH, async move { stocks.stock_returns().await })
            .branch(SAVINGS_BRANCH, async move { savings.interest_returns().await })
            .branch(GOLD_BRANCH, async move { gold.gold_returns().await })
            .run()
            .await
    }
}

/// Interest earned by a savings asset between `interest_start` and `today`.
///
/// Interest compounds over whole calendar months. `None` when no full month
/// has elapsed yet; an error when the start, rate or amount is missing.
pub(crate) fn accrued_interest(
    asset: &Asset,
    today: NaiveDate,
) -> Result<Option<f32>, ReturnsError> {
    let start = match asset.interest_start {
        Some(start) if asset.interest_rate != 0.0 && asset.amount != 0.0 => start,
        _ => return Err(ReturnsError::IncompleteSavings(asset.name.clone())),
    };

    let months = months_between(start, today);
    if today < start || months <= 0 {
        return Ok(None);
    }

    let principal = f64::from(asset.amount);
    let rate = f64::from(asset.interest_rate) / 100.0;
    let periods = f64::from(asset.compounding_frequency.periods_per_year());
    let years = f64::from(months) / 12.0;

    let final_amount = principal * (1.0 + rate / periods).powf(periods * years);
    Ok(Some((final_amount - principal) as f32))
}

fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::assets::fixtures::{gold, savings, stock};
    use crate::portfolio::{Compounding, InMemoryAssetRepository, ResultKey};
    use crate::worker::{JobError, TaskResult};
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn calculator(assets: Vec<crate::portfolio::Asset>) -> ReturnsCalculator {
        let repo = Arc::new(InMemoryAssetRepository::with_assets(assets));
        ReturnsCalculator::new(repo, ResultCache::new())
    }

    async fn publish<K: ResultKey>(calc: &ReturnsCalculator, value: K::Value) {
        calc.results
            .set(K::NAME.to_string(), TaskResult::new(Ok(K::wrap(value))), TTL)
            .await;
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2024, 1, 31), date(2024, 2, 1)), 1);
        assert_eq!(months_between(date(2023, 11, 1), date(2024, 2, 1)), 3);
        assert_eq!(months_between(date(2024, 5, 1), date(2024, 5, 30)), 0);
    }

    #[tokio::test]
    async fn test_stock_returns_sum_lots_by_ticker() {
        let calc = calculator(vec![
            stock("Apple lot 1", "AAPL", 100.0, 2.0),
            stock("Apple lot 2", "AAPL", 150.0, 1.0),
            stock("Microsoft", "MSFT", 300.0, 1.0),
        ])
        .await;
        publish::<StockPrices>(
            &calc,
            HashMap::from([("AAPL".to_string(), 160.0), ("MSFT".to_string(), 290.0)]),
        )
        .await;

        let returns = calc.stock_returns().await.unwrap();
        assert_eq!(returns["AAPL"], 130.0);
        assert_eq!(returns["MSFT"], -10.0);
    }

    #[tokio::test]
    async fn test_stock_returns_without_prices() {
        let calc = calculator(vec![stock("Apple", "AAPL", 100.0, 1.0)]).await;
        assert!(matches!(
            calc.stock_returns().await,
            Err(ReturnsError::StockPricesUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_stock_returns_no_holdings_needs_no_price() {
        let calc = calculator(vec![gold("Bar", 1800.0, 1.0)]).await;
        assert!(calc.stock_returns().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_portfolio_breakdown_is_complete() {
        let calc = calculator(vec![]).await;

        let breakdown = calc.returns_breakdown().await;

        assert!(breakdown.is_complete());
        assert!(breakdown.branch(STOCKS_BRANCH).unwrap().is_empty());
        assert!(breakdown.branch(GOLD_BRANCH).unwrap().is_empty());
        assert!(breakdown.branch(SAVINGS_BRANCH).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stock_returns_missing_ticker() {
        let calc = calculator(vec![stock("Tesla", "TSLA", 100.0, 1.0)]).await;
        publish::<StockPrices>(&calc, HashMap::from([("AAPL".to_string(), 160.0)])).await;

        let err = calc.stock_returns().await.unwrap_err();
        assert_eq!(err.to_string(), "price for ticker TSLA not found in cache");
    }

    #[tokio::test]
    async fn test_failed_price_job_reads_as_unavailable() {
        let calc = calculator(vec![gold("Bar", 1800.0, 2.0)]).await;
        calc.results
            .set(
                GoldPrice::NAME.to_string(),
                TaskResult::new(Err(JobError::failed("timeout"))),
                TTL,
            )
            .await;

        assert!(matches!(
            calc.gold_returns().await,
            Err(ReturnsError::GoldPriceUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_gold_returns() {
        let calc = calculator(vec![gold("Bar", 1800.0, 2.0), gold("Coin", 2000.0, 0.5)]).await;
        publish::<GoldPrice>(&calc, 2100.0).await;

        let returns = calc.gold_returns().await.unwrap();
        assert_eq!(returns["Bar"], 600.0);
        assert_eq!(returns["Coin"], 50.0);
    }

    #[tokio::test]
    async fn test_gold_returns_no_holdings_needs_no_price() {
        let calc = calculator(vec![]).await;
        assert!(calc.gold_returns().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interest_returns_annual_compounding() {
        let calc = calculator(vec![savings(
            "Deposit",
            1000.0,
            5.0,
            Some(date(2022, 3, 10)),
            Compounding::Annually,
        )])
        .await;

        let returns = calc.interest_returns_at(date(2024, 3, 1)).await.unwrap();
        // Two full years at 5% compounded annually.
        assert!((returns["Deposit"] - 102.5).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_interest_returns_skips_future_and_current_month() {
        let calc = calculator(vec![
            savings("Future", 1000.0, 5.0, Some(date(2030, 1, 1)), Compounding::Monthly),
            savings("Fresh", 1000.0, 5.0, Some(date(2024, 3, 2)), Compounding::Monthly),
        ])
        .await;

        let returns = calc.interest_returns_at(date(2024, 3, 20)).await.unwrap();
        assert!(returns.is_empty());
    }

    #[tokio::test]
    async fn test_interest_returns_incomplete_asset() {
        let calc = calculator(vec![savings("Broken", 1000.0, 0.0, None, Compounding::Daily)]).await;

        let err = calc.interest_returns_at(date(2024, 3, 20)).await.unwrap_err();
        assert!(matches!(err, ReturnsError::IncompleteSavings(name) if name == "Broken"));
    }

    #[tokio::test]
    async fn test_breakdown_keeps_successful_branches() {
        let calc = calculator(vec![
            stock("Apple", "AAPL", 100.0, 1.0),
            gold("Bar", 1800.0, 1.0),
            savings("Broken", 1000.0, 0.0, None, Compounding::Monthly),
        ])
        .await;
        publish::<StockPrices>(&calc, HashMap::from([("AAPL".to_string(), 110.0)])).await;
        publish::<GoldPrice>(&calc, 1900.0).await;

        let breakdown = calc.returns_breakdown().await;

        assert_eq!(breakdown.errors.len(), 1);
        assert_eq!(breakdown.errors[0].branch, SAVINGS_BRANCH);
        assert_eq!(breakdown.branch(STOCKS_BRANCH).unwrap()["AAPL"], 10.0);
        assert_eq!(breakdown.branch(GOLD_BRANCH).unwrap()["Bar"], 100.0);
    }
}
