//! Analysis stage inputs and outputs exchanged with the vision, market and
//! price backends.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Currency used for every estimate produced by the pipeline.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Raw image handed to the vision backend.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Storage reference the bytes were persisted under
    pub reference: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An object located in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DetectedObject {
    pub name: String,
    pub confidence: f64,
    /// Normalized `[x_min, y_min, x_max, y_max]`
    #[serde(default)]
    pub bounding_box: Vec<f64>,
}

/// Descriptive label attached to the whole image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Label {
    pub description: String,
    pub confidence: f64,
}

/// Feature vector summarizing the image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Embeddings {
    pub feature_vector: Vec<f64>,
    pub model_version: String,
}

/// High-level attributes inferred from the image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExtractedFeatures {
    #[serde(default)]
    pub dominant_objects: Vec<String>,
    #[serde(default)]
    pub text_detected: Vec<String>,
    pub estimated_category: Option<String>,
    pub brand_detected: Option<String>,
    pub model_detected: Option<String>,
}

/// Output of the vision stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VisionAnalysis {
    pub detected_objects: Vec<DetectedObject>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub embeddings: Embeddings,
    pub extracted_features: ExtractedFeatures,
    pub confidence_score: f64,
    /// Backend specific payload kept for auditing
    #[serde(default)]
    #[schema(value_type = Object)]
    pub raw: JsonValue,
}

/// Lower and upper bound of an estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

/// A listing considered similar to the appraised item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComparableItem {
    pub title: String,
    pub price: f64,
    pub condition: Option<String>,
    pub source: String,
    /// Similarity to the appraised item in `[0, 1]`
    pub similarity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketTrends {
    /// rising, stable or declining
    pub trend_direction: String,
    pub price_change_30d: f64,
    pub volume_change_30d: f64,
    /// low, medium or high
    pub demand_level: String,
}

/// Output of the market stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketAnalysis {
    pub estimated_value: f64,
    pub currency: String,
    pub price_range: PriceRange,
    pub confidence_score: f64,
    pub comparable_items: Vec<ComparableItem>,
    pub market_trends: Option<MarketTrends>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricingBreakdown {
    pub base_market_value: f64,
    pub condition_multiplier: f64,
    pub condition_adjusted: f64,
    pub final_estimate: f64,
}

/// Output of the price stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceEstimate {
    pub estimated_price: f64,
    pub currency: String,
    pub price_range: PriceRange,
    pub confidence_score: f64,
    pub pricing_breakdown: PricingBreakdown,
}

/// Tuning knobs for the market stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOptions {
    /// Maximum number of comparables returned
    pub max_comparables: usize,
    /// Comparables below this similarity are dropped
    pub similarity_threshold: f64,
}

impl Default for MarketOptions {
    fn default() -> Self {
        Self {
            max_comparables: 5,
            similarity_threshold: 0.0,
        }
    }
}

/// Tuning knobs for the price stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOptions {
    /// Upper bound on the reported confidence
    pub confidence_cap: f64,
}

impl Default for PriceOptions {
    fn default() -> Self {
        Self {
            confidence_cap: 0.95,
        }
    }
}
