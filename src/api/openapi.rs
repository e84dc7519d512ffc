//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::config::API_KEY_HEADER;
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SnapValue Server",
        version = "0.1.0",
        description = "Appraise items from a photo: image storage, vision analysis, market comparables and condition-adjusted pricing"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Appraisal endpoints
        api::appraisals::create_appraisal,
        api::appraisals::submit_appraisal,
        api::appraisals::get_appraisal,
        api::appraisals::get_appraisal_status,
        api::appraisals::cancel_appraisal,
        api::appraisals::get_appraisal_stats,
        api::appraisals::list_appraisals,
        // Market data endpoints
        api::market_data::list_market_data,
        api::market_data::get_market_data,
    ),
    components(
        schemas(
            error::ErrorResponse,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::appraisals::AppraisalForm,
            models::AppraisalStatus,
            models::AppraisalResult,
            models::SubmissionResponse,
            models::AppraisalStatusResponse,
            models::AppraisalListResponse,
            models::AppraisalStats,
            models::DetectedObject,
            models::ComparableItem,
            models::PriceRange,
            models::MarketDataItem,
            models::MarketDataListResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Appraisals", description = "Submit images and read appraisal results"),
        (name = "Market Data", description = "Browse the comparable listings catalog")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `X-API-Key` header scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(API_KEY_HEADER),
                    ),
                ),
            );
        }
    }
}
