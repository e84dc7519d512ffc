//! E2E tests: market catalog endpoints.

use snapvalue_lib::models::NewMarketData;

use super::test_helpers::*;

fn listing(title: &str, category: &str, price: f64) -> NewMarketData {
    NewMarketData {
        title: title.to_string(),
        category: category.to_string(),
        price,
        source: "ebay".to_string(),
        ..Default::default()
    }
}

/// Filtering by category and price band, cheapest first.
#[actix_rt::test]
async fn test_list_market_data_filters() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    for (title, category, price) in [
        ("iPhone 12", "electronics", 450.0),
        ("Galaxy S21", "electronics", 380.0),
        ("Pixel 4", "electronics", 120.0),
        ("Oak table", "furniture", 300.0),
    ] {
        ctx.pool
            .insert_market_data(listing(title, category, price))
            .await
            .unwrap();
    }

    let (status, body) = get_json(
        &app,
        "/api/v1/market-data?category=Electronics&min_price=200",
        None,
    )
    .await;
    assert_eq!(status, 200, "{}", body);

    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Galaxy S21", "iPhone 12"]);
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"][0]["currency"], "USD");
}

/// Inverted price band → 400.
#[actix_rt::test]
async fn test_inverted_price_band_rejected() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let (status, _) = get_json(&app, "/api/v1/market-data?min_price=50&max_price=10", None).await;
    assert_eq!(status, 400);
}

/// Single listing lookup and 404.
#[actix_rt::test]
async fn test_get_market_data_by_id() {
    let ctx = create_context().await;
    let app = create_test_app(&ctx).await;

    let row = ctx
        .pool
        .insert_market_data(listing("Vintage watch", "jewelry", 900.0))
        .await
        .unwrap();

    let (status, body) = get_json(&app, &format!("/api/v1/market-data/{}", row.id), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["title"], "Vintage watch");
    assert_eq!(body["category"], "jewelry");

    let (status, _) = get_json(&app, "/api/v1/market-data/99999", None).await;
    assert_eq!(status, 404);
}
