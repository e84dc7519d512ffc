//! Analysis backends for the vision, market and price stages.
//!
//! Each stage is a small capability trait so mock, catalog and remote
//! implementations can be mixed. Backends are stateless with respect to the
//! appraisal being processed; the orchestrator owns all persistence.

mod catalog;
mod checks;
mod mock;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AnalysisKind, AnalysisSettings, MarketKind};
use crate::db::DbPool;
use crate::models::{
    Embeddings, ExtractedFeatures, ImageInput, MarketAnalysis, MarketOptions, PriceEstimate,
    PriceOptions, VisionAnalysis,
};

pub use catalog::CatalogMarketBackend;
pub use checks::StageOutput;
pub use mock::{MockMarketBackend, MockPriceBackend, MockVisionBackend};
pub use remote::RemoteAnalysisClient;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed analysis response: {0}")]
    Malformed(String),

    /// Carries the limit that was exceeded, e.g. `30s`
    #[error("timed out after {0}")]
    Timeout(String),

    #[error("invalid analysis input: {0}")]
    InvalidInput(String),
}

#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn analyze_vision(&self, image: &ImageInput) -> Result<VisionAnalysis, AnalysisError>;
}

#[async_trait]
pub trait MarketBackend: Send + Sync {
    /// Estimate market value. A missing category falls back to the
    /// vision-estimated one, and an unknown category to the default profile.
    async fn analyze_market(
        &self,
        embeddings: &Embeddings,
        features: &ExtractedFeatures,
        category: Option<&str>,
        options: &MarketOptions,
    ) -> Result<MarketAnalysis, AnalysisError>;
}

#[async_trait]
pub trait PriceBackend: Send + Sync {
    async fn calculate_price(
        &self,
        vision: &VisionAnalysis,
        market: &MarketAnalysis,
        condition: Option<&str>,
        options: &PriceOptions,
    ) -> Result<PriceEstimate, AnalysisError>;
}

/// The three stage backends used by one orchestrator.
#[derive(Clone)]
pub struct AnalysisBackends {
    pub vision: Arc<dyn VisionBackend>,
    pub market: Arc<dyn MarketBackend>,
    pub price: Arc<dyn PriceBackend>,
}

impl AnalysisBackends {
    /// Deterministic mock backends for every stage.
    pub fn mock(seed: u64) -> Self {
        Self {
            vision: Arc::new(MockVisionBackend),
            market: Arc::new(MockMarketBackend::new(seed)),
            price: Arc::new(MockPriceBackend),
        }
    }
}

/// Build the configured backends.
pub fn build_backends(
    settings: &AnalysisSettings,
    db: &DbPool,
) -> Result<AnalysisBackends, AnalysisError> {
    let remote = match (settings.kind, settings.market, settings.endpoint.as_deref()) {
        (AnalysisKind::Remote, _, Some(endpoint)) | (_, MarketKind::Remote, Some(endpoint)) => {
            Some(Arc::new(RemoteAnalysisClient::new(
                endpoint,
                settings.timeout(),
            )?))
        }
        (AnalysisKind::Remote, _, None) | (_, MarketKind::Remote, None) => {
            return Err(AnalysisError::InvalidInput(
                "ANALYSIS_ENDPOINT is required for the remote backend".to_string(),
            ));
        }
        _ => None,
    };

    let vision: Arc<dyn VisionBackend> = match &remote {
        Some(client) if settings.kind == AnalysisKind::Remote => client.clone(),
        _ => Arc::new(MockVisionBackend),
    };

    let price: Arc<dyn PriceBackend> = match &remote {
        Some(client) if settings.kind == AnalysisKind::Remote => client.clone(),
        _ => Arc::new(MockPriceBackend),
    };

    let market: Arc<dyn MarketBackend> = match (settings.market, &remote) {
        (MarketKind::Remote, Some(client)) => client.clone(),
        (MarketKind::Catalog, _) => Arc::new(CatalogMarketBackend::new(db.clone())),
        _ => Arc::new(MockMarketBackend::new(settings.mock_seed)),
    };

    tracing::info!(
        "Analysis backends: vision/price={:?}, market={:?}",
        settings.kind,
        settings.market
    );

    Ok(AnalysisBackends {
        vision,
        market,
        price,
    })
}

/// Category to price against: explicit hint first, then the vision estimate.
pub(crate) fn resolve_category<'a>(
    category: Option<&'a str>,
    features: &'a ExtractedFeatures,
) -> Option<&'a str> {
    category
        .filter(|c| !c.trim().is_empty())
        .or(features.estimated_category.as_deref())
}
