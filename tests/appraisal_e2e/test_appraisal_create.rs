//! E2E tests: synchronous appraisal creation.

use snapvalue_lib::models::AppraisalStatus;

use super::test_helpers::*;

/// 50KB JPEG, electronics in good condition → completed appraisal.
#[actix_rt::test]
async fn test_create_appraisal_completes() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(50 * 1024), "electronics", "good");
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 201, "Appraisal should be created: {}", body);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["category"], "electronics");
    assert_eq!(body["condition"], "good");
    assert!(body["error_message"].is_null());
    assert!(body["completed_at"].is_string());

    let price = body["estimated_price"].as_f64().expect("estimated_price");
    let min = body["price_range"]["min"].as_f64().expect("range min");
    let max = body["price_range"]["max"].as_f64().expect("range max");
    assert!(price > 0.0);
    assert!(min <= price && price <= max, "{} not in [{}, {}]", price, min, max);
    assert_eq!(body["price_range"]["currency"], "USD");

    let confidence = body["confidence_score"].as_f64().expect("confidence");
    assert!((0.0..=0.95).contains(&confidence));
    assert_eq!(body["detected_objects"].as_array().map(Vec::len), Some(2));
    assert!(!body["comparable_items"].as_array().unwrap().is_empty());

    let id = body["id"].as_str().unwrap();
    let stored = ctx.storage_dir.path().join(format!("images/{}/phone.jpg", id));
    assert_eq!(std::fs::metadata(stored).unwrap().len(), 50 * 1024);
    assert_eq!(
        body["image_url"],
        format!("http://localhost:8000/uploads/images/{}/phone.jpg", id)
    );
}

/// The stored appraisal is readable by ID and matches the creation response.
#[actix_rt::test]
async fn test_get_appraisal_by_id() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = appraisal_form(&fake_jpeg(4096), "jewelry", "excellent");
    let (_, created) = post_form(&app, "/api/v1/appraisals", form, None).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = get_json(&app, &format!("/api/v1/appraisals/{}", id), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], id);
    assert_eq!(body["estimated_price"], created["estimated_price"]);

    let (status, body) = get_json(&app, &format!("/api/v1/appraisals/{}/status", id), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["appraisal_id"], id);
    assert_eq!(body["status"], "completed");
}

/// Without a category the vision estimate is used.
#[actix_rt::test]
async fn test_category_falls_back_to_vision() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let form = multipart_body(&[Part::File {
        name: "image",
        filename: "item.png",
        content_type: "image/png",
        bytes: &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0],
    }]);
    let (status, body) = post_form(&app, "/api/v1/appraisals", form, None).await;

    assert_eq!(status, 201, "{}", body);
    assert_eq!(body["status"], "completed");
    assert!(body["estimated_price"].as_f64().unwrap() > 0.0);
}

/// Identical inputs give identical prices with the seeded mock.
#[actix_rt::test]
async fn test_mock_pricing_is_deterministic() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let mut prices = Vec::new();
    for _ in 0..2 {
        let form = appraisal_form(&fake_jpeg(1024), "electronics", "like_new");
        let (_, body) = post_form(&app, "/api/v1/appraisals", form, None).await;
        prices.push(body["estimated_price"].as_f64().unwrap());
    }

    assert_eq!(prices[0], prices[1]);
    assert_eq!(
        ctx.pool
            .count_appraisals_by_status(AppraisalStatus::Completed)
            .await
            .unwrap(),
        2
    );
}
