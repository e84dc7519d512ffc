//! E2E tests: API key attribution and per-user history.

use super::test_helpers::*;

/// Appraisals made with a key show up in that user's history only.
#[actix_rt::test]
async fn test_history_lists_own_appraisals() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let (_, alice_key) = ctx.pool.insert_user("alice@example.com").await.unwrap();
    let (_, bob_key) = ctx.pool.insert_user("bob@example.com").await.unwrap();

    for _ in 0..3 {
        let form = appraisal_form(&fake_jpeg(1024), "electronics", "good");
        let (status, _) = post_form(&app, "/api/v1/appraisals", form, Some(&alice_key)).await;
        assert_eq!(status, 201);
    }
    let form = appraisal_form(&fake_jpeg(1024), "toys", "new");
    post_form(&app, "/api/v1/appraisals", form, Some(&bob_key)).await;

    // Anonymous appraisals are not attributed to anyone
    let form = appraisal_form(&fake_jpeg(1024), "toys", "new");
    post_form(&app, "/api/v1/appraisals", form, None).await;

    let (status, body) = get_json(&app, "/api/v1/appraisals?limit=2", Some(&alice_key)).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["appraisals"].as_array().unwrap().len(), 2);

    let (_, page2) = get_json(&app, "/api/v1/appraisals?limit=2&offset=2", Some(&alice_key)).await;
    assert_eq!(page2["appraisals"].as_array().unwrap().len(), 1);

    let (_, bob) = get_json(&app, "/api/v1/appraisals", Some(&bob_key)).await;
    assert_eq!(bob["total"], 1);
    assert_eq!(bob["appraisals"][0]["category"], "toys");
}

/// History requires a valid key.
#[actix_rt::test]
async fn test_history_requires_api_key() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = get_json(&app, "/api/v1/appraisals", None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = get_json(&app, "/api/v1/appraisals", Some("sv_not-a-real-key")).await;
    assert_eq!(status, 401);
}

/// A deactivated user's key stops working, including on uploads.
#[actix_rt::test]
async fn test_deactivated_user_rejected() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let (user, key) = ctx.pool.insert_user("carol@example.com").await.unwrap();
    ctx.pool.set_user_active(user.id, false).await.unwrap();

    let (status, _) = get_json(&app, "/api/v1/appraisals", Some(&key)).await;
    assert_eq!(status, 401);

    let form = appraisal_form(&fake_jpeg(1024), "electronics", "good");
    let (status, _) = post_form(&app, "/api/v1/appraisals", form, Some(&key)).await;
    assert_eq!(status, 401);
}
