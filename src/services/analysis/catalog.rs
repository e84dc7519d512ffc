//! Market backend that prices against the `market_data` catalog.

use async_trait::async_trait;

use crate::db::DbPool;
use crate::entity::market_data;
use crate::models::{
    ComparableItem, DEFAULT_CURRENCY, Embeddings, ExtractedFeatures, MarketAnalysis,
    MarketOptions, PriceRange,
};
use crate::services::pricing::{CategoryProfile, category_profile, round2};

use super::{AnalysisError, MarketBackend, resolve_category};

/// Candidate listings fetched before similarity ranking.
const DEFAULT_CANDIDATE_LIMIT: u64 = 200;
/// Confidence reported when no comparables exist.
const EMPTY_CATALOG_CONFIDENCE: f64 = 0.5;
const MAX_CONFIDENCE: f64 = 0.95;

/// Ranks catalog listings in the category's price band by embedding
/// similarity and takes the similarity-weighted mean of the best matches.
pub struct CatalogMarketBackend {
    db: DbPool,
    candidate_limit: u64,
}

impl CatalogMarketBackend {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }
}

/// Cosine similarity clamped to `[0, 1]`. Mismatched or zero vectors score 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

fn listing_embeddings(row: &market_data::Model) -> Vec<f64> {
    row.embeddings
        .clone()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn profile_range(value: f64, profile: &CategoryProfile) -> PriceRange {
    PriceRange {
        min: round2(value * 0.7).max(profile.min).min(value),
        max: round2(value * 1.3).min(profile.max).max(value),
        currency: DEFAULT_CURRENCY.to_string(),
    }
}

#[async_trait]
impl MarketBackend for CatalogMarketBackend {
    async fn analyze_market(
        &self,
        embeddings: &Embeddings,
        features: &ExtractedFeatures,
        category: Option<&str>,
        options: &MarketOptions,
    ) -> Result<MarketAnalysis, AnalysisError> {
        let profile = category_profile(resolve_category(category, features));

        let rows = self
            .db
            .find_comparables(
                Some(profile.name),
                Some(profile.min),
                Some(profile.max),
                self.candidate_limit,
            )
            .await
            .map_err(|e| AnalysisError::Unavailable(e.to_string()))?;

        let mut scored: Vec<(f64, market_data::Model)> = rows
            .into_iter()
            .map(|row| {
                let similarity =
                    cosine_similarity(&embeddings.feature_vector, &listing_embeddings(&row));
                (similarity, row)
            })
            .filter(|(similarity, _)| *similarity >= options.similarity_threshold)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(options.max_comparables);

        if scored.is_empty() {
            tracing::debug!(
                "No catalog comparables for {}, using profile average",
                profile.name
            );
            return Ok(MarketAnalysis {
                estimated_value: profile.avg,
                currency: DEFAULT_CURRENCY.to_string(),
                price_range: profile_range(profile.avg, profile),
                confidence_score: EMPTY_CATALOG_CONFIDENCE,
                comparable_items: Vec::new(),
                market_trends: None,
            });
        }

        let total_weight: f64 = scored.iter().map(|(s, _)| s).sum();
        let estimated_value = if total_weight > 0.0 {
            scored.iter().map(|(s, row)| s * row.price).sum::<f64>() / total_weight
        } else {
            scored.iter().map(|(_, row)| row.price).sum::<f64>() / scored.len() as f64
        };
        let estimated_value = round2(estimated_value);

        let mean_similarity = total_weight / scored.len() as f64;
        let coverage = (scored.len() as f64 / options.max_comparables.max(1) as f64).min(1.0);
        let confidence_score = (EMPTY_CATALOG_CONFIDENCE
            + (MAX_CONFIDENCE - EMPTY_CATALOG_CONFIDENCE) * mean_similarity * coverage)
            .min(MAX_CONFIDENCE);

        let lowest = scored
            .iter()
            .map(|(_, row)| row.price)
            .fold(f64::INFINITY, f64::min);
        let highest = scored
            .iter()
            .map(|(_, row)| row.price)
            .fold(f64::NEG_INFINITY, f64::max);

        let comparable_items = scored
            .into_iter()
            .map(|(similarity, row)| ComparableItem {
                title: row.title,
                price: row.price,
                condition: row.condition,
                source: row.source,
                similarity_score: round2(similarity),
            })
            .collect();

        Ok(MarketAnalysis {
            estimated_value,
            currency: DEFAULT_CURRENCY.to_string(),
            price_range: PriceRange {
                min: lowest.min(estimated_value),
                max: highest.max(estimated_value),
                currency: DEFAULT_CURRENCY.to_string(),
            },
            confidence_score,
            comparable_items,
            market_trends: None,
        })
    }
}
