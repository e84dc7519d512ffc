//! Database queries for appraisals.
//!
//! Status-changing writes are single conditional UPDATEs keyed on the id and
//! the set of statuses the move is allowed from.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::appraisal::{self, ActiveModel, Entity as Appraisal};
use crate::error::{AppError, AppResult};
use crate::models::{
    AppraisalRequest, AppraisalStatus, ComparableItem, MarketAnalysis, PriceEstimate,
    VisionAnalysis,
};

use super::DbPool;

impl DbPool {
    /// Insert a new appraisal in `pending` state.
    pub async fn insert_appraisal(
        &self,
        id: &str,
        image_path: &str,
        request: &AppraisalRequest,
    ) -> AppResult<appraisal::Model> {
        let now = Utc::now();

        let model = ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(request.user_id),
            image_path: Set(image_path.to_string()),
            image_url: Set(None),
            status: Set(AppraisalStatus::Pending.as_str().to_string()),
            category: Set(request.category.clone()),
            item_condition: Set(request.condition.clone()),
            vision_results: Set(None),
            detected_objects: Set(None),
            embeddings: Set(None),
            similar_items: Set(None),
            market_price: Set(None),
            estimated_price: Set(None),
            price_range_min: Set(None),
            price_range_max: Set(None),
            confidence_score: Set(None),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert appraisal: {}", e)))?;

        Ok(result)
    }

    /// Get an appraisal by ID.
    pub async fn get_appraisal(&self, id: &str) -> AppResult<Option<appraisal::Model>> {
        let result = Appraisal::find_by_id(id.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get appraisal: {}", e)))?;

        Ok(result)
    }

    /// `pending -> processing`, recording where the image was stored.
    pub async fn start_processing(
        &self,
        id: &str,
        image_path: &str,
        image_url: Option<&str>,
    ) -> AppResult<()> {
        let changes = ActiveModel {
            status: Set(AppraisalStatus::Processing.as_str().to_string()),
            image_path: Set(image_path.to_string()),
            image_url: Set(image_url.map(str::to_string)),
            ..Default::default()
        };

        self.update_in_states(
            id,
            AppraisalStatus::Processing.allowed_sources(),
            changes,
            "start processing",
        )
        .await
    }

    /// Persist vision stage output. Only valid while processing.
    pub async fn record_vision_results(&self, id: &str, vision: &VisionAnalysis) -> AppResult<()> {
        let changes = ActiveModel {
            vision_results: Set(Some(serde_json::to_value(vision)?)),
            detected_objects: Set(Some(serde_json::to_value(&vision.detected_objects)?)),
            embeddings: Set(Some(serde_json::to_value(&vision.embeddings)?)),
            ..Default::default()
        };

        self.update_in_states(
            id,
            &[AppraisalStatus::Processing],
            changes,
            "record vision results",
        )
        .await
    }

    /// Persist the comparables found by the market stage. Only valid while
    /// processing.
    pub async fn record_comparables(&self, id: &str, items: &[ComparableItem]) -> AppResult<()> {
        let changes = ActiveModel {
            similar_items: Set(Some(serde_json::to_value(items)?)),
            ..Default::default()
        };

        self.update_in_states(
            id,
            &[AppraisalStatus::Processing],
            changes,
            "record comparables",
        )
        .await
    }

    /// `processing -> completed` with the final price fields.
    pub async fn complete_appraisal(
        &self,
        id: &str,
        market: &MarketAnalysis,
        price: &PriceEstimate,
    ) -> AppResult<appraisal::Model> {
        let changes = ActiveModel {
            status: Set(AppraisalStatus::Completed.as_str().to_string()),
            market_price: Set(Some(market.estimated_value)),
            estimated_price: Set(Some(price.estimated_price)),
            price_range_min: Set(Some(price.price_range.min)),
            price_range_max: Set(Some(price.price_range.max)),
            confidence_score: Set(Some(price.confidence_score)),
            completed_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        self.update_in_states(
            id,
            AppraisalStatus::Completed.allowed_sources(),
            changes,
            "complete appraisal",
        )
        .await?;

        self.get_appraisal(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {}", id)))
    }

    /// `pending | processing -> failed` with a human-readable reason.
    pub async fn fail_appraisal(&self, id: &str, error_message: &str) -> AppResult<()> {
        let changes = ActiveModel {
            status: Set(AppraisalStatus::Failed.as_str().to_string()),
            error_message: Set(Some(error_message.to_string())),
            completed_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        self.update_in_states(
            id,
            AppraisalStatus::Failed.allowed_sources(),
            changes,
            "fail appraisal",
        )
        .await
    }

    /// A user's appraisals, newest first, with the total count.
    pub async fn list_user_appraisals(
        &self,
        user_id: i32,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<appraisal::Model>, u64)> {
        let query = Appraisal::find().filter(appraisal::Column::UserId.eq(user_id));

        let total = query
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count appraisals: {}", e)))?;

        let rows = query
            .order_by_desc(appraisal::Column::CreatedAt)
            .order_by_desc(appraisal::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list appraisals: {}", e)))?;

        Ok((rows, total))
    }

    pub async fn count_appraisals_by_status(&self, status: AppraisalStatus) -> AppResult<u64> {
        Appraisal::find()
            .filter(appraisal::Column::Status.eq(status.as_str()))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count appraisals: {}", e)))
    }

    async fn update_in_states(
        &self,
        id: &str,
        allowed: &[AppraisalStatus],
        mut changes: ActiveModel,
        action: &str,
    ) -> AppResult<()> {
        changes.updated_at = Set(Utc::now());

        let result = Appraisal::update_many()
            .set(changes)
            .filter(appraisal::Column::Id.eq(id))
            .filter(appraisal::Column::Status.is_in(allowed.iter().map(|s| s.as_str())))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to {}: {}", action, e)))?;

        if result.rows_affected == 1 {
            return Ok(());
        }

        match self.get_appraisal(id).await? {
            None => Err(AppError::NotFound(format!("Appraisal {}", id))),
            Some(current) => Err(AppError::InvalidInput(format!(
                "invalid transition: cannot {} for appraisal {} in status {}",
                action, id, current.status
            ))),
        }
    }
}
