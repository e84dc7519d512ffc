//! Appraisal orchestration.
//!
//! Drives one appraisal through storage, vision, market and price stages and
//! owns its status transitions for the duration of the run. Stage failures
//! end the run with a `failed` record; only persistence errors propagate.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::StorageKind;
use crate::db::DbPool;
use crate::entity::appraisal;
use crate::error::{AppError, AppResult};
use crate::models::{
    AppraisalListParams, AppraisalListResponse, AppraisalRequest, AppraisalResult,
    AppraisalStats, AppraisalStatus, AppraisalStatusResponse, ImageInput, ImageUpload,
    MarketOptions, PriceOptions, SubmissionResponse,
};
use crate::services::analysis::{AnalysisBackends, AnalysisError, StageOutput, resolve_category};
use crate::services::storage::{StorageBackend, UploadPolicy, object_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Storage,
    Vision,
    Market,
    Price,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Storage => "image storage",
            Stage::Vision => "vision analysis",
            Stage::Market => "market analysis",
            Stage::Price => "price calculation",
        };
        f.write_str(name)
    }
}

/// Why a pipeline run stopped early.
enum PipelineError {
    /// A stage failed; the appraisal is marked failed.
    Stage { stage: Stage, message: String },
    /// The store itself failed; nothing more can be recorded.
    Persistence(AppError),
}

impl From<AppError> for PipelineError {
    fn from(err: AppError) -> Self {
        PipelineError::Persistence(err)
    }
}

fn stage_failed(stage: Stage) -> impl FnOnce(String) -> PipelineError {
    move |message| PipelineError::Stage { stage, message }
}

/// Message recorded on appraisals cancelled by their owner.
pub const CANCELLED_MESSAGE: &str = "cancelled by user";

#[derive(Clone)]
pub struct AppraisalService {
    db: DbPool,
    storage: Arc<dyn StorageBackend>,
    backends: AnalysisBackends,
    stage_timeout: Duration,
    permits: Arc<Semaphore>,
    market_options: MarketOptions,
    price_options: PriceOptions,
}

impl AppraisalService {
    pub fn new(
        db: DbPool,
        storage: Arc<dyn StorageBackend>,
        backends: AnalysisBackends,
        stage_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            db,
            storage,
            backends,
            stage_timeout,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            market_options: MarketOptions::default(),
            price_options: PriceOptions::default(),
        }
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        self.storage.policy()
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// Run the whole pipeline and return the stored result.
    ///
    /// Invalid uploads are rejected before any record exists. Every other
    /// failure yields a result with `status = failed`. The run is detached
    /// from the caller, so a dropped request still ends in a terminal state.
    pub async fn create_appraisal_from_upload(
        &self,
        upload: ImageUpload,
        request: AppraisalRequest,
    ) -> AppResult<AppraisalResult> {
        let permit = self.acquire_permit()?;
        let record = self.admit(&upload, &request).await?;
        let id = record.id.clone();

        self.spawn_pipeline(permit, record.id, record.image_path, upload, request)
            .await
            .map_err(|e| AppError::Internal(format!("Appraisal task for {} aborted: {}", id, e)))??;

        self.get_appraisal(&id).await
    }

    /// Record the appraisal and process it in the background.
    pub async fn submit_appraisal(
        &self,
        upload: ImageUpload,
        request: AppraisalRequest,
    ) -> AppResult<SubmissionResponse> {
        let permit = self.acquire_permit()?;
        let record = self.admit(&upload, &request).await?;

        let response = SubmissionResponse {
            appraisal_id: record.id.clone(),
            status: AppraisalStatus::Pending,
            submitted_at: record.created_at,
        };

        // Completion is observed through the status endpoint
        drop(self.spawn_pipeline(permit, record.id, record.image_path, upload, request));

        Ok(response)
    }

    pub async fn get_appraisal(&self, id: &str) -> AppResult<AppraisalResult> {
        self.db
            .get_appraisal(id)
            .await?
            .map(AppraisalResult::from_model)
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {}", id)))
    }

    pub async fn get_status(&self, id: &str) -> AppResult<AppraisalStatusResponse> {
        self.db
            .get_appraisal(id)
            .await?
            .map(AppraisalStatusResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {}", id)))
    }

    pub async fn list_user_appraisals(
        &self,
        user_id: i32,
        params: &AppraisalListParams,
    ) -> AppResult<AppraisalListResponse> {
        let (limit, offset) = (params.limit(), params.offset());
        let (rows, total) = self.db.list_user_appraisals(user_id, limit, offset).await?;

        Ok(AppraisalListResponse {
            appraisals: rows.into_iter().map(AppraisalResult::from_model).collect(),
            total,
            limit,
            offset,
        })
    }

    /// Stop a pending or processing appraisal.
    ///
    /// Appraisals owned by a user can only be cancelled by that user; others
    /// see them as missing. A running pipeline notices at its next write.
    pub async fn cancel_appraisal(
        &self,
        id: &str,
        caller: Option<i32>,
    ) -> AppResult<AppraisalStatusResponse> {
        let record = self
            .db
            .get_appraisal(id)
            .await?
            .filter(|r| r.user_id.is_none() || r.user_id == caller)
            .ok_or_else(|| AppError::NotFound(format!("Appraisal {}", id)))?;

        self.db.fail_appraisal(&record.id, CANCELLED_MESSAGE).await?;
        info!(appraisal_id = %id, "Appraisal cancelled");

        self.get_status(id).await
    }

    /// Appraisal counts per status.
    pub async fn stats(&self) -> AppResult<AppraisalStats> {
        let pending = self.db.count_appraisals_by_status(AppraisalStatus::Pending).await?;
        let processing = self
            .db
            .count_appraisals_by_status(AppraisalStatus::Processing)
            .await?;
        let completed = self
            .db
            .count_appraisals_by_status(AppraisalStatus::Completed)
            .await?;
        let failed = self.db.count_appraisals_by_status(AppraisalStatus::Failed).await?;

        Ok(AppraisalStats::new(pending, processing, completed, failed))
    }

    fn acquire_permit(&self) -> AppResult<OwnedSemaphorePermit> {
        self.permits.clone().try_acquire_owned().map_err(|_| {
            warn!("Appraisal rejected: too many concurrent appraisals");
            AppError::ServiceUnavailable(
                "Too many concurrent appraisals. Please try again later.".to_string(),
            )
        })
    }

    /// Validate the upload and insert the pending record.
    async fn admit(
        &self,
        upload: &ImageUpload,
        request: &AppraisalRequest,
    ) -> AppResult<appraisal::Model> {
        self.storage.validate(&upload.bytes, &upload.content_type)?;

        let id = Uuid::now_v7().to_string();
        let key = object_key(&id, &upload.filename);
        self.db.insert_appraisal(&id, &key, request).await
    }

    /// Run stages 2-6 on the tokio runtime, holding `permit` until done.
    fn spawn_pipeline(
        &self,
        permit: OwnedSemaphorePermit,
        id: String,
        key: String,
        upload: ImageUpload,
        request: AppraisalRequest,
    ) -> JoinHandle<AppResult<()>> {
        let service = self.clone();
        let span = info_span!("appraisal", appraisal_id = %id);

        tokio::spawn(
            async move {
                let _permit = permit;
                let result = service.run_pipeline(&id, &key, upload, &request).await;
                if let Err(e) = &result {
                    error!("Appraisal could not be finalized: {}", e);
                }
                result
            }
            .instrument(span),
        )
    }

    async fn run_pipeline(
        &self,
        id: &str,
        key: &str,
        upload: ImageUpload,
        request: &AppraisalRequest,
    ) -> AppResult<()> {
        let outcome = match self.execute_stages(id, key, upload, request).await {
            Ok(()) => {
                info!("Appraisal completed");
                return Ok(());
            }
            Err(PipelineError::Stage { stage, message }) => {
                warn!("Appraisal failed during {}: {}", stage, message);
                self.db
                    .fail_appraisal(id, &format!("{} failed: {}", stage, message))
                    .await
            }
            Err(PipelineError::Persistence(e)) => Err(e),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(AppError::InvalidInput(message)) => {
                if self.is_cancelled(id).await? {
                    info!("Appraisal was cancelled while running");
                    return Ok(());
                }
                error!("Appraisal aborted by invalid transition: {}", message);
                Err(AppError::InvalidInput(message))
            }
            Err(e) => {
                error!("Appraisal aborted by persistence error: {}", e);
                Err(e)
            }
        }
    }

    async fn is_cancelled(&self, id: &str) -> AppResult<bool> {
        Ok(self.db.get_appraisal(id).await?.is_some_and(|r| {
            r.status == AppraisalStatus::Failed.as_str()
                && r.error_message.as_deref() == Some(CANCELLED_MESSAGE)
        }))
    }

    async fn execute_stages(
        &self,
        id: &str,
        key: &str,
        upload: ImageUpload,
        request: &AppraisalRequest,
    ) -> Result<(), PipelineError> {
        let stored = self
            .storage
            .store(key, &upload.bytes, &upload.content_type)
            .await
            .map_err(|e| e.to_string())
            .map_err(stage_failed(Stage::Storage))?;

        self.db
            .start_processing(id, &stored.reference, stored.public_url.as_deref())
            .await?;

        let image = ImageInput {
            reference: stored.reference,
            content_type: upload.content_type,
            bytes: upload.bytes,
        };

        let vision = self
            .timed(Stage::Vision, self.backends.vision.analyze_vision(&image))
            .await
            .map_err(stage_failed(Stage::Vision))?;
        self.db.record_vision_results(id, &vision).await?;

        let category = resolve_category(request.category.as_deref(), &vision.extracted_features);
        let market = self
            .timed(
                Stage::Market,
                self.backends.market.analyze_market(
                    &vision.embeddings,
                    &vision.extracted_features,
                    category,
                    &self.market_options,
                ),
            )
            .await
            .map_err(stage_failed(Stage::Market))?;
        self.db
            .record_comparables(id, &market.comparable_items)
            .await?;

        let price = self
            .timed(
                Stage::Price,
                self.backends.price.calculate_price(
                    &vision,
                    &market,
                    request.condition.as_deref(),
                    &self.price_options,
                ),
            )
            .await
            .map_err(stage_failed(Stage::Price))?;

        self.db.complete_appraisal(id, &market, &price).await?;
        Ok(())
    }

    /// Await one analysis call, bounded by the stage timeout, and check its
    /// output before anything is persisted.
    async fn timed<T: StageOutput>(
        &self,
        stage: Stage,
        call: impl Future<Output = Result<T, AnalysisError>>,
    ) -> Result<T, String> {
        match tokio::time::timeout(self.stage_timeout, call).await {
            Ok(Ok(value)) => match value.check() {
                Ok(()) => Ok(value),
                Err(e) => Err(e.to_string()),
            },
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => {
                warn!("{} exceeded {:?}", stage, self.stage_timeout);
                Err(AnalysisError::Timeout(format!("{:?}", self.stage_timeout)).to_string())
            }
        }
    }
}
