//! Appraisal entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appraisals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Option<i32>,
    /// Storage reference (local key or object-store URI)
    pub image_path: String,
    pub image_url: Option<String>,
    /// Status: pending, processing, completed, failed
    pub status: String,
    /// Category hint supplied with the request
    pub category: Option<String>,
    /// Condition hint supplied with the request
    pub item_condition: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub vision_results: Option<JsonValue>,
    #[sea_orm(column_type = "Json", nullable)]
    pub detected_objects: Option<JsonValue>,
    #[sea_orm(column_type = "Json", nullable)]
    pub embeddings: Option<JsonValue>,
    #[sea_orm(column_type = "Json", nullable)]
    pub similar_items: Option<JsonValue>,
    /// Market value of comparable items before condition adjustment
    pub market_price: Option<f64>,
    /// Final condition-adjusted estimate
    pub estimated_price: Option<f64>,
    pub price_range_min: Option<f64>,
    pub price_range_max: Option<f64>,
    pub confidence_score: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
