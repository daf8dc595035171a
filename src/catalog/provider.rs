//! Catalog data source capability.
//!
//! The storefront never reads product data directly; it asks a
//! [`CatalogProvider`], so a network-backed source can replace the static one
//! without touching cart state.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;
use tracing::{debug, instrument};

use hashbrown::HashSet;

use crate::types::{CategoryId, LineId};

use super::record::{CatalogRecord, Category};

/// Failures from a catalog source.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The source could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    /// Catalog payload did not decode.
    #[error("catalog decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    /// Two products or variants share a line id.
    #[error("line id {0} is used twice in the catalog")]
    DuplicateId(LineId),
}

/// Async source of categories and product records.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All browsable categories.
    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Products of `category`, or every product for `None`.
    async fn fetch_catalog(&self, category: Option<CategoryId>) -> Result<Vec<CatalogRecord>, CatalogError>;
}

/// Static provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Simulated network delay before each response.
    pub latency_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { latency_ms: 500 }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    categories: Vec<Category>,
    records: Vec<CatalogRecord>,
}

/// In-process catalog answering after a fixed delay.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    categories: Vec<Category>,
    records: Vec<CatalogRecord>,
    latency: Duration,
}

impl StaticCatalog {
    /// Catalog over the given data. Product and variant ids must not collide.
    pub fn new(
        categories: Vec<Category>,
        records: Vec<CatalogRecord>,
        config: CatalogConfig,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for record in &records {
            let ids = std::iter::once(record.id).chain(record.variants.iter().map(|v| v.id));
            for id in ids {
                if !seen.insert(id) {
                    return Err(CatalogError::DuplicateId(id));
                }
            }
        }
        Ok(Self {
            categories,
            records,
            latency: Duration::from_millis(config.latency_ms),
        })
    }

    /// Catalog decoded from a `{ "categories": [...], "records": [...] }` document.
    pub fn from_json(json: &str, config: CatalogConfig) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Self::new(doc.categories, doc.records, config)
    }

    /// Bundled fish/chicken/mutton/fruit assortment.
    pub fn demo(config: CatalogConfig) -> Result<Self, CatalogError> {
        Self::from_json(include_str!("demo.json"), config)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    #[instrument(name = "catalog::fetch_categories", skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.simulate_latency().await;
        Ok(self.categories.clone())
    }

    #[instrument(name = "catalog::fetch_catalog", skip(self))]
    async fn fetch_catalog(&self, category: Option<CategoryId>) -> Result<Vec<CatalogRecord>, CatalogError> {
        self.simulate_latency().await;
        let out: Vec<CatalogRecord> = self
            .records
            .iter()
            .filter(|r| category.is_none_or(|c| r.category_id == c))
            .cloned()
            .collect();
        debug!(count = out.len(), "catalog records served");
        Ok(out)
    }
}
