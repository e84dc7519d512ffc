//! Deterministic mock backends for development and tests.
//!
//! The market mock draws its variation from a `StdRng` seeded by the
//! configured seed and the category, so identical inputs always produce
//! identical output.

use async_trait::async_trait;
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::models::{
    ComparableItem, DEFAULT_CURRENCY, DetectedObject, Embeddings, ExtractedFeatures, ImageInput,
    Label, MarketAnalysis, MarketOptions, MarketTrends, PriceEstimate, PriceOptions, PriceRange,
    VisionAnalysis,
};
use crate::services::pricing::{self, category_profile, round2};

use super::{AnalysisError, MarketBackend, PriceBackend, VisionBackend, resolve_category};

const MOCK_MODEL_VERSION: &str = "mock-v1.0";

/// Returns the same phone fixture for every image.
pub struct MockVisionBackend;

#[async_trait]
impl VisionBackend for MockVisionBackend {
    async fn analyze_vision(&self, image: &ImageInput) -> Result<VisionAnalysis, AnalysisError> {
        if image.bytes.is_empty() {
            return Err(AnalysisError::InvalidInput("image is empty".to_string()));
        }

        let bounding_box = vec![0.1, 0.1, 0.8, 0.8];

        Ok(VisionAnalysis {
            detected_objects: vec![
                DetectedObject {
                    name: "phone".to_string(),
                    confidence: 0.95,
                    bounding_box: bounding_box.clone(),
                },
                DetectedObject {
                    name: "electronic device".to_string(),
                    confidence: 0.88,
                    bounding_box,
                },
            ],
            labels: vec![
                label("Mobile phone", 0.95),
                label("Electronics", 0.90),
                label("Technology", 0.85),
            ],
            embeddings: Embeddings {
                feature_vector: [0.1, 0.2, 0.3, 0.4, 0.5].repeat(20),
                model_version: MOCK_MODEL_VERSION.to_string(),
            },
            extracted_features: ExtractedFeatures {
                dominant_objects: vec!["phone".to_string(), "electronic device".to_string()],
                text_detected: vec!["iPhone".to_string(), "12".to_string()],
                estimated_category: Some("electronics".to_string()),
                brand_detected: Some("Apple".to_string()),
                model_detected: Some("iPhone 12".to_string()),
            },
            confidence_score: 0.92,
            raw: json!({
                "backend": "mock",
                "text": { "full_text": "iPhone 12" },
                "colors": [
                    { "color": "black", "percentage": 60 },
                    { "color": "silver", "percentage": 40 }
                ],
                "image_reference": image.reference,
                "image_bytes": image.bytes.len(),
            }),
        })
    }
}

fn label(description: &str, confidence: f64) -> Label {
    Label {
        description: description.to_string(),
        confidence,
    }
}

/// Prices items around the category profile average.
pub struct MockMarketBackend {
    seed: u64,
}

impl MockMarketBackend {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, category: &str) -> StdRng {
        let digest = Sha256::digest(category.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        StdRng::seed_from_u64(self.seed ^ u64::from_le_bytes(bytes))
    }
}

/// Uniform draw in `[low, high)`.
fn draw(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    let unit: f64 = StandardUniform.sample(rng);
    low + unit * (high - low)
}

fn pick<'a>(rng: &mut StdRng, choices: &[&'a str]) -> &'a str {
    let index = (draw(rng, 0.0, choices.len() as f64) as usize).min(choices.len() - 1);
    choices[index]
}

#[async_trait]
impl MarketBackend for MockMarketBackend {
    async fn analyze_market(
        &self,
        _embeddings: &Embeddings,
        features: &ExtractedFeatures,
        category: Option<&str>,
        options: &MarketOptions,
    ) -> Result<MarketAnalysis, AnalysisError> {
        let profile = category_profile(resolve_category(category, features));
        let mut rng = self.rng_for(profile.name);

        let variance = draw(&mut rng, 0.8, 1.2);
        let estimated_value = round2(profile.avg * variance);
        let price_min = round2(estimated_value * 0.7).max(profile.min);
        let price_max = round2(estimated_value * 1.3).min(profile.max);
        let confidence_score = draw(&mut rng, 0.75, 0.95);

        let mut comparable_items = vec![
            ComparableItem {
                title: format!("Similar {} item 1", profile.name),
                price: round2(estimated_value + draw(&mut rng, -50.0, 50.0)),
                condition: Some("used".to_string()),
                source: "mock_marketplace".to_string(),
                similarity_score: 0.85,
            },
            ComparableItem {
                title: format!("Similar {} item 2", profile.name),
                price: round2(estimated_value + draw(&mut rng, -75.0, 75.0)),
                condition: Some("good".to_string()),
                source: "mock_auction".to_string(),
                similarity_score: 0.78,
            },
        ];
        comparable_items.retain(|item| item.similarity_score >= options.similarity_threshold);
        comparable_items.truncate(options.max_comparables);

        let market_trends = MarketTrends {
            trend_direction: pick(&mut rng, &["rising", "stable", "declining"]).to_string(),
            price_change_30d: round2(draw(&mut rng, -0.1, 0.15)),
            volume_change_30d: round2(draw(&mut rng, -0.2, 0.25)),
            demand_level: pick(&mut rng, &["low", "medium", "high"]).to_string(),
        };

        Ok(MarketAnalysis {
            estimated_value,
            currency: DEFAULT_CURRENCY.to_string(),
            price_range: PriceRange {
                min: price_min,
                max: price_max,
                currency: DEFAULT_CURRENCY.to_string(),
            },
            confidence_score,
            comparable_items,
            market_trends: Some(market_trends),
        })
    }
}

/// Applies the standard pricing rules to the market value.
pub struct MockPriceBackend;

#[async_trait]
impl PriceBackend for MockPriceBackend {
    async fn calculate_price(
        &self,
        vision: &VisionAnalysis,
        market: &MarketAnalysis,
        condition: Option<&str>,
        options: &PriceOptions,
    ) -> Result<PriceEstimate, AnalysisError> {
        if !market.estimated_value.is_finite() || market.estimated_value < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "market value {} cannot be priced",
                market.estimated_value
            )));
        }

        Ok(pricing::calculate_price(
            market.estimated_value,
            condition,
            vision.confidence_score,
            options,
        ))
    }
}
