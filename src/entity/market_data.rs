//! Market data entity: comparable real-world listings used for pricing.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "market_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub price: f64,
    pub currency: String,
    pub original_price: Option<f64>,
    /// Listing origin, e.g. "ebay", "amazon", "etsy"
    pub source: String,
    pub source_url: Option<String>,
    pub source_id: Option<String>,
    /// Embedding vector as a JSON array of floats
    #[sea_orm(column_type = "Json", nullable)]
    pub embeddings: Option<JsonValue>,
    #[sea_orm(column_type = "Json", nullable)]
    pub features: Option<JsonValue>,
    pub image_url: Option<String>,
    pub scraped_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
