//! Asset model and repository contract.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Asset class, which decides how returns are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Stock,
    Gold,
    Savings,
}

/// How often interest is compounded on a savings asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compounding {
    Daily,
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl Compounding {
    /// Compounding periods per year.
    pub fn periods_per_year(self) -> u32 {
        match self {
            Compounding::Daily => 365,
            Compounding::Monthly => 12,
            Compounding::Quarterly => 4,
            Compounding::Annually => 1,
        }
    }
}

/// A holding in the portfolio.
///
/// `price` is the purchase price per unit for stocks and gold; for savings the
/// principal is `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default)]
    pub price: f32,
    #[serde(default)]
    pub amount: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_start: Option<NaiveDate>,
    #[serde(default)]
    pub interest_rate: f32,
    #[serde(default)]
    pub compounding_frequency: Compounding,
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("failed to read asset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse asset file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Storage for portfolio assets.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn all_assets(&self) -> Result<Vec<Asset>, RepositoryError>;

    async fn asset_by_id(&self, id: u64) -> Result<Option<Asset>, RepositoryError>;

    async fn assets_by_kind(&self, kind: AssetKind) -> Result<Vec<Asset>, RepositoryError>;

    /// Stores `asset`, assigning it the next id. Returns the stored asset.
    async fn insert(&self, asset: Asset) -> Result<Asset, RepositoryError>;
}

/// Asset repository kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAssetRepository {
    assets: RwLock<Vec<Asset>>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository holding `assets`, renumbering their ids from 1.
    pub fn with_assets(assets: impl IntoIterator<Item = Asset>) -> Self {
        let assets = assets
            .into_iter()
            .enumerate()
            .map(|(index, mut asset)| {
                asset.id = index as u64 + 1;
                asset
            })
            .collect();
        Self {
            assets: RwLock::new(assets),
        }
    }

    /// Loads a JSON array of assets.
    pub async fn from_json_file(path: &Path) -> Result<Self, RepositoryError> {
        let raw = tokio::fs::read(path).await?;
        let assets: Vec<Asset> = serde_json::from_slice(&raw)?;
        Ok(Self::with_assets(assets))
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn all_assets(&self) -> Result<Vec<Asset>, RepositoryError> {
        Ok(self.assets.read().await.clone())
    }

    async fn asset_by_id(&self, id: u64) -> Result<Option<Asset>, RepositoryError> {
        Ok(self
            .assets
            .read()
            .await
            .iter()
            .find(|asset| asset.id == id)
            .cloned())
    }

    async fn assets_by_kind(&self, kind: AssetKind) -> Result<Vec<Asset>, RepositoryError> {
        Ok(self
            .assets
            .read()
            .await
            .iter()
            .filter(|asset| asset.kind == kind)
            .cloned()
            .collect())
    }

    async fn insert(&self, mut asset: Asset) -> Result<Asset, RepositoryError> {
        let mut assets = self.assets.write().await;
        asset.id = assets.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        assets.push(asset.clone());
        Ok(asset)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_asset_deserialize() {
        let json = r#"{
            "name": "Savings account",
            "type": "Savings",
            "amount": 1000,
            "interestStart": "2024-01-15",
            "interestRate": 3.5,
            "compoundingFrequency": "quarterly"
        }"#;
        let asset: Asset = serde_json::from_str(json).unwrap();

        assert_eq!(asset.kind, AssetKind::Savings);
        assert_eq!(asset.amount, 1000.0);
        assert_eq!(asset.interest_start, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(asset.compounding_frequency, Compounding::Quarterly);
        assert!(asset.ticker.is_none());
    }

    #[test]
    fn test_compounding_defaults_to_monthly() {
        let json = r#"{"name": "Cash", "type": "Savings"}"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.compounding_frequency.periods_per_year(), 12);
    }

    #[tokio::test]
    async fn test_repository_filters_by_kind() {
        let repo = InMemoryAssetRepository::with_assets([
            stock("Apple", "AAPL", 150.0, 2.0),
            gold("Bar", 1800.0, 1.0),
            stock("Microsoft", "MSFT", 300.0, 1.0),
        ]);

        let stocks = repo.assets_by_kind(AssetKind::Stock).await.unwrap();
        assert_eq!(stocks.len(), 2);
        assert_eq!(stocks[1].id, 3);

        let savings = repo.assets_by_kind(AssetKind::Savings).await.unwrap();
        assert!(savings.is_empty());
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id() {
        let repo = InMemoryAssetRepository::with_assets([gold("Bar", 1800.0, 1.0)]);

        let stored = repo.insert(stock("Apple", "AAPL", 150.0, 2.0)).await.unwrap();

        assert_eq!(stored.id, 2);
        assert_eq!(repo.all_assets().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_asset_by_id() {
        let repo = InMemoryAssetRepository::with_assets([
            gold("Bar", 1800.0, 1.0),
            stock("Apple", "AAPL", 150.0, 2.0),
        ]);

        let found = repo.asset_by_id(2).await.unwrap().unwrap();
        assert_eq!(found.name, "Apple");
        assert!(repo.asset_by_id(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_missing_file_is_io_error() {
        let result =
            InMemoryAssetRepository::from_json_file(Path::new("/nonexistent/assets.json")).await;
        assert!(matches!(result, Err(RepositoryError::Io(_))));
    }
}
