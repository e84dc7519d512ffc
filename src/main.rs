//! SnapValue server entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use snapvalue_lib::api;
use snapvalue_lib::config::{API_KEY_HEADER, Config};
use snapvalue_lib::db::DbPool;
use snapvalue_lib::middleware::RequestLogger;
use snapvalue_lib::services::{
    AppraisalService, StorageBackend, UploadPolicy, build_backends, build_storage,
};

/// Room for the multipart envelope and text fields on top of the image.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Log and exit; startup errors are not recoverable.
fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, err);
    std::process::exit(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must be set");
            error!("  - STORAGE_TYPE=cloud requires the S3_* settings");
            error!("  - ANALYSIS_BACKEND=remote requires ANALYSIS_ENDPOINT");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  SnapValue Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config.database).await {
        Ok(pool) => pool,
        Err(e) => fail("Failed to connect to database", e),
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        fail("Failed to run migrations", e);
    }
    info!("Database migrations complete");

    let policy = UploadPolicy::from_settings(&config.upload);
    let storage = match build_storage(&config.storage, policy).await {
        Ok(storage) => storage,
        Err(e) => fail("Failed to initialize storage", e),
    };
    info!("Storage backend: {}", storage.kind().as_str());

    let backends = match build_backends(&config.analysis, &pool) {
        Ok(backends) => backends,
        Err(e) => fail("Failed to initialize analysis backends", e),
    };
    info!(
        "Analysis backends: vision/price={:?}, market={:?}",
        config.analysis.kind, config.analysis.market
    );

    let service = AppraisalService::new(
        pool.clone(),
        storage,
        backends,
        config.analysis.timeout(),
        config.max_concurrent_appraisals,
    );
    info!(
        "Appraisal limits: {}MB max image, {} concurrent appraisals",
        config.upload.max_file_size / 1024 / 1024,
        config.max_concurrent_appraisals
    );

    let bind_address = config.bind_address();
    let allowed_origins = config.allowed_origins();
    let payload_limit = config.upload.max_file_size + MULTIPART_OVERHEAD;
    let pool_data = web::Data::new(pool);
    let service_data = web::Data::new(service);
    let openapi = api::ApiDoc::openapi();

    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .allowed_header(API_KEY_HEADER)
            .max_age(3600);
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            // CORS must wrap before other middleware
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(pool_data.clone())
            .app_data(service_data.clone())
            .app_data(web::PayloadConfig::new(payload_limit))
            .service(web::scope("/api/v1").configure(api::configure_api))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
