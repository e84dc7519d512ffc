//! Market catalog read endpoints.

use actix_web::{HttpResponse, web};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{MarketDataItem, MarketDataListResponse, MarketDataQuery};

/// Search catalog listings by category and price band, cheapest first.
#[utoipa::path(
    get,
    path = "/api/v1/market-data",
    tag = "Market Data",
    params(MarketDataQuery),
    responses(
        (status = 200, description = "Matching listings", body = MarketDataListResponse),
        (status = 400, description = "Invalid price band", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_market_data(
    pool: web::Data<DbPool>,
    query: web::Query<MarketDataQuery>,
) -> AppResult<HttpResponse> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price)
        && min > max
    {
        return Err(AppError::InvalidInput(
            "min_price must not exceed max_price".to_string(),
        ));
    }

    let category = query.category.as_deref();
    let rows = pool
        .find_comparables(category, query.min_price, query.max_price, query.limit())
        .await?;
    let total = pool.count_market_data(category).await?;

    Ok(HttpResponse::Ok().json(MarketDataListResponse {
        items: rows.into_iter().map(MarketDataItem::from).collect(),
        total,
    }))
}

/// Get one catalog listing.
#[utoipa::path(
    get,
    path = "/api/v1/market-data/{id}",
    tag = "Market Data",
    params(
        ("id" = i32, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Listing", body = MarketDataItem),
        (status = 404, description = "Listing not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_market_data(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let row = pool
        .get_market_data(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Market data {}", id)))?;

    Ok(HttpResponse::Ok().json(MarketDataItem::from(row)))
}

/// Configure market data routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/market-data").route(web::get().to(list_market_data)))
        .service(web::resource("/market-data/{id}").route(web::get().to(get_market_data)));
}
