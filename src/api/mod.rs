//! API endpoint modules.

pub mod appraisals;
pub mod health;
pub mod market_data;
pub mod openapi;

pub use appraisals::configure_routes as configure_appraisal_routes;
pub use health::configure_health_routes;
pub use market_data::configure_routes as configure_market_data_routes;
pub use openapi::ApiDoc;

use actix_web::web;

/// Mount every `/api/v1` route group.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_appraisal_routes)
        .configure(configure_market_data_routes);
}
