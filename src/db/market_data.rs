//! Database queries for the market catalog.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::market_data::{self, ActiveModel, Entity as MarketData};
use crate::error::{AppError, AppResult};
use crate::models::{DEFAULT_CURRENCY, NewMarketData};

use super::DbPool;

impl DbPool {
    pub async fn insert_market_data(&self, item: NewMarketData) -> AppResult<market_data::Model> {
        if item.title.trim().is_empty() || item.category.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "market data requires a title and a category".to_string(),
            ));
        }
        if !item.price.is_finite() || item.price < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "invalid market price {}",
                item.price
            )));
        }

        let now = Utc::now();
        let embeddings = item.embeddings.map(serde_json::to_value).transpose()?;

        let model = ActiveModel {
            title: Set(item.title),
            description: Set(item.description),
            category: Set(item.category.to_lowercase()),
            subcategory: Set(item.subcategory),
            brand: Set(item.brand),
            condition: Set(item.condition),
            price: Set(item.price),
            currency: Set(item
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())),
            original_price: Set(item.original_price),
            source: Set(item.source),
            source_url: Set(item.source_url),
            source_id: Set(item.source_id),
            embeddings: Set(embeddings),
            features: Set(item.features),
            image_url: Set(item.image_url),
            scraped_at: Set(item.scraped_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert market data: {}", e)))
    }

    pub async fn get_market_data(&self, id: i32) -> AppResult<Option<market_data::Model>> {
        MarketData::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get market data: {}", e)))
    }

    /// Listings in a category within an optional price band, cheapest first.
    pub async fn find_comparables(
        &self,
        category: Option<&str>,
        min_price: Option<f64>,
        max_price: Option<f64>,
        limit: u64,
    ) -> AppResult<Vec<market_data::Model>> {
        let mut query = MarketData::find();

        if let Some(category) = category {
            query = query.filter(market_data::Column::Category.eq(category.to_lowercase()));
        }
        if let Some(min) = min_price {
            query = query.filter(market_data::Column::Price.gte(min));
        }
        if let Some(max) = max_price {
            query = query.filter(market_data::Column::Price.lte(max));
        }

        query
            .order_by_asc(market_data::Column::Price)
            .order_by_asc(market_data::Column::Id)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to query market data: {}", e)))
    }

    pub async fn count_market_data(&self, category: Option<&str>) -> AppResult<u64> {
        let mut query = MarketData::find();
        if let Some(category) = category {
            query = query.filter(market_data::Column::Category.eq(category.to_lowercase()));
        }

        query
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count market data: {}", e)))
    }
}
