//! E2E tests: background submission and status polling.

use std::time::Duration;

use snapvalue_lib::services::AnalysisBackends;

use super::test_helpers::*;

/// Submit → 202 pending, then the status endpoint reaches completed.
#[actix_rt::test]
async fn test_submit_then_poll_until_completed() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(8 * 1024), "furniture", "fair");
    let (status, body) = post_form(&app, "/api/v1/appraisals/submit", form, None).await;

    assert_eq!(status, 202, "{}", body);
    assert_eq!(body["status"], "pending");
    let id = body["appraisal_id"].as_str().unwrap().to_string();

    let status_uri = format!("/api/v1/appraisals/{}/status", id);
    let mut last = serde_json::Value::Null;
    for _ in 0..100 {
        let (code, body) = get_json(&app, &status_uri, None).await;
        assert_eq!(code, 200);
        last = body;
        if last["status"] == "completed" || last["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(last["status"], "completed", "{}", last);

    let (_, result) = get_json(&app, &format!("/api/v1/appraisals/{}", id), None).await;
    assert!(result["estimated_price"].as_f64().unwrap() > 0.0);
}

/// Invalid uploads are rejected synchronously on submit too.
#[actix_rt::test]
async fn test_submit_rejects_invalid_upload() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = multipart_body(&[Part::File {
        name: "image",
        filename: "doc.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.4",
    }]);
    let (status, _) = post_form(&app, "/api/v1/appraisals/submit", form, None).await;

    assert_eq!(status, 422);
}

/// No free slots → 503.
#[actix_rt::test]
async fn test_capacity_exhausted() {
    let ctx = create_context_with(AnalysisBackends::mock(1), Duration::from_secs(5), 0).await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(1024), "electronics", "good");
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 503, "{}", body);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
}
