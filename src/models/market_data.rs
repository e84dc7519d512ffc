//! Market catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};

use crate::entity::market_data;

/// A listing to add to the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMarketData {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub price: f64,
    /// Defaults to USD
    pub currency: Option<String>,
    pub original_price: Option<f64>,
    pub source: String,
    pub source_url: Option<String>,
    pub source_id: Option<String>,
    pub embeddings: Option<Vec<f64>>,
    pub features: Option<JsonValue>,
    pub image_url: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
}

/// Catalog listing as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarketDataItem {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub price: f64,
    pub currency: String,
    pub original_price: Option<f64>,
    pub source: String,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<market_data::Model> for MarketDataItem {
    fn from(model: market_data::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            category: model.category,
            subcategory: model.subcategory,
            brand: model.brand,
            condition: model.condition,
            price: model.price,
            currency: model.currency,
            original_price: model.original_price,
            source: model.source,
            source_url: model.source_url,
            image_url: model.image_url,
            scraped_at: model.scraped_at,
            created_at: model.created_at,
        }
    }
}

/// Filters for catalog lookups.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MarketDataQuery {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Maximum rows returned, capped at 100
    pub limit: Option<u64>,
}

impl MarketDataQuery {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarketDataListResponse {
    pub items: Vec<MarketDataItem>,
    pub total: u64,
}
