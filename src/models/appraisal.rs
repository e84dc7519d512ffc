//! Appraisal domain types: lifecycle status, pipeline inputs and API views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::appraisal;

use super::analysis::{ComparableItem, DEFAULT_CURRENCY, DetectedObject, PriceRange};

/// Appraisal lifecycle status.
///
/// `pending -> processing -> completed | failed`, plus `pending -> failed`
/// when the image never reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppraisalStatus {
    /// Record created, image not yet stored.
    Pending,
    /// Image stored, analysis running.
    Processing,
    /// Price estimate available.
    Completed,
    /// A stage failed; see `error_message`.
    Failed,
}

impl AppraisalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: AppraisalStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// States a record may be in for a move to `self` to be accepted.
    pub fn allowed_sources(&self) -> &'static [AppraisalStatus] {
        match self {
            Self::Pending => &[],
            Self::Processing => &[Self::Pending],
            Self::Completed => &[Self::Processing],
            Self::Failed => &[Self::Pending, Self::Processing],
        }
    }
}

impl std::fmt::Display for AppraisalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Caller-supplied context for an appraisal.
#[derive(Debug, Clone, Default)]
pub struct AppraisalRequest {
    pub user_id: Option<i32>,
    /// Category hint, overrides the vision estimate
    pub category: Option<String>,
    /// Item condition, e.g. `good` or `like_new`
    pub condition: Option<String>,
}

/// Appraisal as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppraisalResult {
    pub id: String,
    pub status: AppraisalStatus,
    /// Final condition-adjusted estimate
    pub estimated_price: Option<f64>,
    /// Market value of comparables before condition adjustment
    pub market_price: Option<f64>,
    pub price_range: Option<PriceRange>,
    pub confidence_score: Option<f64>,
    pub detected_objects: Vec<DetectedObject>,
    pub comparable_items: Vec<ComparableItem>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub error_message: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AppraisalResult {
    pub fn from_model(model: appraisal::Model) -> Self {
        let status = AppraisalStatus::parse(&model.status).unwrap_or(AppraisalStatus::Failed);

        let price_range = match (model.price_range_min, model.price_range_max) {
            (Some(min), Some(max)) => Some(PriceRange {
                min,
                max,
                currency: DEFAULT_CURRENCY.to_string(),
            }),
            _ => None,
        };

        let detected_objects = model
            .detected_objects
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let comparable_items = model
            .similar_items
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Self {
            id: model.id,
            status,
            estimated_price: model.estimated_price,
            market_price: model.market_price,
            price_range,
            confidence_score: model.confidence_score,
            detected_objects,
            comparable_items,
            category: model.category,
            condition: model.item_condition,
            error_message: model.error_message,
            image_url: model.image_url,
            created_at: model.created_at,
            completed_at: model.completed_at,
        }
    }
}

/// Response for a deferred submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub appraisal_id: String,
    pub status: AppraisalStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Lightweight status view for polling clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppraisalStatusResponse {
    pub appraisal_id: String,
    pub status: AppraisalStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<appraisal::Model> for AppraisalStatusResponse {
    fn from(model: appraisal::Model) -> Self {
        Self {
            status: AppraisalStatus::parse(&model.status).unwrap_or(AppraisalStatus::Failed),
            appraisal_id: model.id,
            error_message: model.error_message,
            created_at: model.created_at,
            updated_at: model.updated_at,
            completed_at: model.completed_at,
        }
    }
}

/// Query parameters for the appraisal history endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppraisalListParams {
    /// Page size, capped at 100
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl AppraisalListParams {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppraisalListResponse {
    pub appraisals: Vec<AppraisalResult>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Appraisal counts per status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppraisalStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
    /// Completed share of finished appraisals, 0 when none finished
    pub success_rate_percent: f64,
}

impl AppraisalStats {
    pub fn new(pending: u64, processing: u64, completed: u64, failed: u64) -> Self {
        let finished = completed + failed;
        let success_rate_percent = if finished == 0 {
            0.0
        } else {
            (completed as f64 / finished as f64 * 10_000.0).round() / 100.0
        };

        Self {
            pending,
            processing,
            completed,
            failed,
            total: pending + processing + completed + failed,
            success_rate_percent,
        }
    }
}
