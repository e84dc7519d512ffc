//! Shared test helpers for appraisal E2E tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use serde_json::Value;
use tempfile::TempDir;

use snapvalue_lib::config::{API_KEY_HEADER, DatabaseSettings};
use snapvalue_lib::db::DbPool;
use snapvalue_lib::services::storage::LocalStorage;
use snapvalue_lib::services::{AnalysisBackends, AppraisalService, UploadPolicy};

pub const BOUNDARY: &str = "----snapvalue-test-boundary";

/// Upload limit used by every test app.
pub const TEST_MAX_FILE_SIZE: usize = 256 * 1024;

/// Everything a test app needs; the temp dir lives as long as this does.
pub struct TestContext {
    pub pool: DbPool,
    pub service: AppraisalService,
    pub storage_dir: TempDir,
}

/// Fresh in-memory database with migrations applied.
pub async fn create_test_pool() -> DbPool {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 5,
    };
    let pool = DbPool::new(&settings)
        .await
        .expect("Failed to open in-memory database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    pool
}

/// Context with mock backends and a generous stage timeout.
pub async fn create_context() -> TestContext {
    create_context_with(AnalysisBackends::mock(42), Duration::from_secs(5), 4).await
}

pub async fn create_context_with(
    backends: AnalysisBackends,
    stage_timeout: Duration,
    max_concurrent: usize,
) -> TestContext {
    let pool = create_test_pool().await;
    let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");
    let storage = LocalStorage::new(
        storage_dir.path().to_path_buf(),
        Some("http://localhost:8000/uploads".to_string()),
        UploadPolicy {
            max_file_size: TEST_MAX_FILE_SIZE,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        },
    );
    let service = AppraisalService::new(
        pool.clone(),
        Arc::new(storage),
        backends,
        stage_timeout,
        max_concurrent,
    );

    TestContext {
        pool,
        service,
        storage_dir,
    }
}

/// Create the test app with every `/api/v1` route mounted.
pub async fn create_test_app(
    ctx: &TestContext,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(ctx.service.clone()))
            .service(web::scope("/api/v1").configure(snapvalue_lib::api::configure_api)),
    )
    .await
}

/// One part of a multipart form.
pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A fake JPEG: SOI marker followed by filler.
pub fn fake_jpeg(size: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(size, 0x42);
    bytes
}

/// Standard form: a JPEG plus category and condition.
pub fn appraisal_form(image: &[u8], category: &str, condition: &str) -> Vec<u8> {
    multipart_body(&[
        Part::File {
            name: "image",
            filename: "phone.jpg",
            content_type: "image/jpeg",
            bytes: image,
        },
        Part::Text {
            name: "category",
            value: category,
        },
        Part::Text {
            name: "condition",
            value: condition,
        },
    ])
}

/// POST a multipart body, optionally with an API key.
pub async fn post_form<S>(app: &S, uri: &str, body: Vec<u8>, api_key: Option<&str>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::post().uri(uri).insert_header((
        "Content-Type",
        format!("multipart/form-data; boundary={}", BOUNDARY),
    ));
    if let Some(key) = api_key {
        req = req.insert_header((API_KEY_HEADER, key));
    }

    let resp = test::call_service(app, req.set_payload(body).to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// GET a JSON endpoint, optionally with an API key.
pub async fn get_json<S>(app: &S, uri: &str, api_key: Option<&str>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::get().uri(uri);
    if let Some(key) = api_key {
        req = req.insert_header((API_KEY_HEADER, key));
    }

    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// DELETE a resource, optionally with an API key.
pub async fn delete_json<S>(app: &S, uri: &str, api_key: Option<&str>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::delete().uri(uri);
    if let Some(key) = api_key {
        req = req.insert_header((API_KEY_HEADER, key));
    }

    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}
