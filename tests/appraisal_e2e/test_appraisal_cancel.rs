//! E2E tests: cancellation and processing statistics.

use std::time::Duration;

use serde_json::Value;
use snapvalue_lib::models::AppraisalRequest;

use super::test_helpers::*;

fn pending_request(user_id: Option<i32>) -> AppraisalRequest {
    AppraisalRequest {
        user_id,
        category: Some("electronics".to_string()),
        condition: Some("good".to_string()),
    }
}

/// Pending appraisal → DELETE marks it failed; a second DELETE → 400.
#[actix_rt::test]
async fn test_cancel_pending_appraisal() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;
    ctx.pool
        .insert_appraisal(
            "apr-pending",
            "images/apr-pending/phone.jpg",
            &pending_request(None),
        )
        .await
        .unwrap();

    let (status, body) = delete_json(&app, "/api/v1/appraisals/apr-pending", None).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error_message"], "cancelled by user");
    assert!(body["completed_at"].is_string());

    let (status, body) = delete_json(&app, "/api/v1/appraisals/apr-pending", None).await;
    assert_eq!(status, 400, "{}", body);
    assert_eq!(body["error"], "INVALID_INPUT");
}

/// Completed appraisal → 400 and the result is untouched.
#[actix_rt::test]
async fn test_cancel_completed_appraisal_rejected() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(2048), "electronics", "good");
    let (_, created) = post_form(&app, "/api/v1/appraisals", form, None).await;
    assert_eq!(created["status"], "completed");
    let uri = format!("/api/v1/appraisals/{}", created["id"].as_str().unwrap());

    let (status, body) = delete_json(&app, &uri, None).await;
    assert_eq!(status, 400, "{}", body);

    let (_, fetched) = get_json(&app, &uri, None).await;
    assert_eq!(fetched["status"], "completed");
    assert_eq!(fetched["estimated_price"], created["estimated_price"]);
}

/// Someone else's appraisal looks missing; the owner can cancel it.
#[actix_rt::test]
async fn test_cancel_requires_owner_key() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;
    let (alice, alice_key) = ctx.pool.insert_user("alice@example.com").await.unwrap();
    let (_, bob_key) = ctx.pool.insert_user("bob@example.com").await.unwrap();
    ctx.pool
        .insert_appraisal(
            "apr-owned",
            "images/apr-owned/phone.jpg",
            &pending_request(Some(alice.id)),
        )
        .await
        .unwrap();
    let uri = "/api/v1/appraisals/apr-owned";

    let (status, _) = delete_json(&app, uri, None).await;
    assert_eq!(status, 404);
    let (status, _) = delete_json(&app, uri, Some(&bob_key)).await;
    assert_eq!(status, 404);
    let (status, _) = delete_json(&app, uri, Some("sv_not-a-real-key")).await;
    assert_eq!(status, 401);

    let (status, body) = delete_json(&app, uri, Some(&alice_key)).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["status"], "failed");
}

/// Cancel right after submit: whichever wins, the run ends consistently.
#[actix_rt::test]
async fn test_cancel_racing_background_run() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(8 * 1024), "electronics", "good");
    let (_, submitted) = post_form(&app, "/api/v1/appraisals/submit", form, None).await;
    let id = submitted["appraisal_id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/appraisals/{}", id);

    let (cancel_status, _) = delete_json(&app, &uri, None).await;
    assert!(cancel_status == 200 || cancel_status == 400, "got {}", cancel_status);

    let mut last = Value::Null;
    for _ in 0..100 {
        let (_, body) = get_json(&app, &format!("{}/status", uri), None).await;
        last = body;
        if last["status"] == "completed" || last["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    if cancel_status == 200 {
        assert_eq!(last["status"], "failed", "{}", last);
        assert_eq!(last["error_message"], "cancelled by user");
        // The cancelled run must not write a price afterwards
        tokio::time::sleep(Duration::from_millis(100)).await;
        let (_, result) = get_json(&app, &uri, None).await;
        assert_eq!(result["status"], "failed");
        assert!(result["estimated_price"].is_null());
    } else {
        assert_eq!(last["status"], "completed", "{}", last);
    }
}

/// Stats reflect completed, failed and pending appraisals.
#[actix_rt::test]
async fn test_stats_endpoint() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let (status, empty) = get_json(&app, "/api/v1/appraisals/stats", None).await;
    assert_eq!(status, 200, "{}", empty);
    assert_eq!(empty["total"], 0);
    assert_eq!(empty["success_rate_percent"], 0.0);

    let form = appraisal_form(&fake_jpeg(2048), "electronics", "good");
    let (status, _) = post_form(&app, "/api/v1/appraisals", form, None).await;
    assert_eq!(status, 201);
    ctx.pool
        .insert_appraisal("apr-a", "images/apr-a/phone.jpg", &pending_request(None))
        .await
        .unwrap();
    ctx.pool
        .insert_appraisal("apr-b", "images/apr-b/phone.jpg", &pending_request(None))
        .await
        .unwrap();
    let (status, _) = delete_json(&app, "/api/v1/appraisals/apr-b", None).await;
    assert_eq!(status, 200);

    let (status, stats) = get_json(&app, "/api/v1/appraisals/stats", None).await;
    assert_eq!(status, 200, "{}", stats);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["processing"], 0);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["failed"], 1);
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["success_rate_percent"], 50.0);
}
