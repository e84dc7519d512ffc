//! E2E tests: rejected uploads and failing analysis stages.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use snapvalue_lib::models::{AppraisalStatus, ImageInput, VisionAnalysis};
use snapvalue_lib::services::AnalysisBackends;
use snapvalue_lib::services::analysis::{AnalysisError, VisionBackend};

use super::test_helpers::*;

struct FailingVision;

#[async_trait]
impl VisionBackend for FailingVision {
    async fn analyze_vision(&self, _: &ImageInput) -> Result<VisionAnalysis, AnalysisError> {
        Err(AnalysisError::Unavailable("vision service down".to_string()))
    }
}

struct SlowVision;

#[async_trait]
impl VisionBackend for SlowVision {
    async fn analyze_vision(&self, _: &ImageInput) -> Result<VisionAnalysis, AnalysisError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(AnalysisError::Unavailable("unreachable".to_string()))
    }
}

async fn assert_no_appraisals(ctx: &TestContext) {
    for status in [
        AppraisalStatus::Pending,
        AppraisalStatus::Processing,
        AppraisalStatus::Completed,
        AppraisalStatus::Failed,
    ] {
        assert_eq!(
            ctx.pool.count_appraisals_by_status(status).await.unwrap(),
            0,
            "unexpected {} appraisal",
            status
        );
    }
}

/// text/plain upload → 422 and nothing persisted.
#[actix_rt::test]
async fn test_disallowed_type_rejected() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = multipart_body(&[Part::File {
        name: "image",
        filename: "notes.txt",
        content_type: "text/plain",
        bytes: b"not an image",
    }]);
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 422, "{}", body);
    assert_eq!(body["error"], "FILE_VALIDATION_ERROR");
    assert_no_appraisals(&ctx).await;
}

/// Text declared as a JPEG → 422 and nothing persisted.
#[actix_rt::test]
async fn test_mislabelled_content_rejected() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = multipart_body(&[Part::File {
        name: "image",
        filename: "notes.jpg",
        content_type: "image/jpeg",
        bytes: b"just some text, not a photo",
    }]);
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 422, "{}", body);
    assert_eq!(body["error"], "FILE_VALIDATION_ERROR");
    assert_no_appraisals(&ctx).await;
}

/// Oversized image → 413 and nothing persisted.
#[actix_rt::test]
async fn test_oversized_image_rejected() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(TEST_MAX_FILE_SIZE + 10), "electronics", "good");
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 413, "{}", body);
    assert_no_appraisals(&ctx).await;
}

/// Empty image part → 422.
#[actix_rt::test]
async fn test_empty_image_rejected() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&[], "electronics", "good");
    let (status, _) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 422);
    assert_no_appraisals(&ctx).await;
}

/// Form without an image part → 400.
#[actix_rt::test]
async fn test_missing_image_part() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = multipart_body(&[Part::Text {
        name: "category",
        value: "electronics",
    }]);
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 400, "{}", body);
    assert_eq!(body["error"], "INVALID_INPUT");
}

/// Vision failure → appraisal persisted as failed with no price fields.
#[actix_rt::test]
async fn test_vision_failure_persists_failed_appraisal() {
    let mut backends = AnalysisBackends::mock(42);
    backends.vision = Arc::new(FailingVision);
    let ctx = create_context_with(backends, Duration::from_secs(5), 4).await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(2048), "electronics", "good");
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 201, "{}", body);
    assert_eq!(body["status"], "failed");
    assert!(
        body["error_message"]
            .as_str()
            .unwrap()
            .contains("vision service down")
    );
    assert!(body["estimated_price"].is_null());
    assert!(body["market_price"].is_null());
    assert!(body["price_range"].is_null());
    assert!(body["completed_at"].is_string());

    let id = body["id"].as_str().unwrap();
    let (_, fetched) = get_json(&app, &format!("/api/v1/appraisals/{}", id), None).await;
    assert_eq!(fetched["status"], "failed");
}

/// Stage exceeding its timeout → failed with a timeout message.
#[actix_rt::test]
async fn test_stage_timeout_persists_failed_appraisal() {
    let mut backends = AnalysisBackends::mock(42);
    backends.vision = Arc::new(SlowVision);
    let ctx = create_context_with(backends, Duration::from_millis(50), 4).await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(2048), "electronics", "good");
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 201, "{}", body);
    assert_eq!(body["status"], "failed");
    assert!(body["error_message"].as_str().unwrap().contains("timed out"));
}

/// Unknown appraisal ID → 404.
#[actix_rt::test]
async fn test_unknown_appraisal_not_found() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = get_json(&app, "/api/v1/appraisals/does-not-exist", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = get_json(&app, "/api/v1/appraisals/does-not-exist/status", None).await;
    assert_eq!(status, 404);
}
