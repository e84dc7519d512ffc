//! Appraisal API endpoints.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::{ApiKeyAuth, OptionalApiKeyAuth};
use crate::error::{AppError, AppResult};
use crate::models::{
    AppraisalListParams, AppraisalListResponse, AppraisalRequest, AppraisalResult,
    AppraisalStats, AppraisalStatusResponse, ImageUpload, SubmissionResponse,
};
use crate::services::AppraisalService;

/// Longest accepted `category` or `condition` value.
const MAX_TEXT_FIELD_LEN: usize = 256;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Multipart form accepted by the appraisal endpoints.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AppraisalForm {
    /// Item photo (JPEG, PNG or WebP)
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
    /// Category hint, e.g. `electronics` or `jewelry`
    category: Option<String>,
    /// Item condition: new, like_new, excellent, good, fair or poor
    condition: Option<String>,
}

/// Fields read from an appraisal form.
struct ParsedForm {
    image: Option<ImageUpload>,
    category: Option<String>,
    condition: Option<String>,
}

/// Read the form, buffering at most `max_file_size + 1` image bytes.
///
/// One byte past the limit is enough for validation to report the upload as
/// too large.
async fn read_appraisal_form(payload: &mut Multipart, max_file_size: usize) -> AppResult<ParsedForm> {
    let mut form = ParsedForm {
        image: None,
        category: None,
        condition: None,
    };

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or("upload")
                    .to_string();
                let content_type = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
                let bytes = read_capped(&mut field, max_file_size.saturating_add(1)).await?;

                form.image = Some(ImageUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "category" => form.category = read_text(&mut field).await?,
            "condition" => form.condition = read_text(&mut field).await?,
            _ => drain_field(&mut field).await,
        }
    }

    Ok(form)
}

async fn read_capped(field: &mut Field, cap: usize) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
        let room = cap - data.len();
        if chunk.len() >= room {
            data.extend_from_slice(&chunk[..room]);
            drain_field(field).await;
            break;
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn read_text(field: &mut Field) -> AppResult<Option<String>> {
    let name = field.name().unwrap_or_default().to_string();
    let bytes = read_capped(field, MAX_TEXT_FIELD_LEN + 1).await?;
    if bytes.len() > MAX_TEXT_FIELD_LEN {
        return Err(AppError::InvalidInput(format!("{} is too long", name)));
    }

    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::InvalidInput(format!("{} must be UTF-8 text", name)))?;
    let text = text.trim();

    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Drain a multipart field without saving.
async fn drain_field(field: &mut Field) {
    while field.next().await.is_some() {}
}

async fn parse_submission(
    payload: &mut Multipart,
    service: &AppraisalService,
    auth: OptionalApiKeyAuth,
) -> AppResult<(ImageUpload, AppraisalRequest)> {
    let form = read_appraisal_form(payload, service.upload_policy().max_file_size).await?;
    let image = form
        .image
        .ok_or_else(|| AppError::InvalidInput("Missing 'image' file part".to_string()))?;

    let request = AppraisalRequest {
        user_id: auth.user.map(|u| u.id),
        category: form.category,
        condition: form.condition,
    };

    Ok((image, request))
}

/// Appraise an uploaded image.
///
/// Runs the full pipeline before responding. A failed analysis still returns
/// 201 with `status = failed` and an `error_message`.
#[utoipa::path(
    post,
    path = "/api/v1/appraisals",
    tag = "Appraisals",
    request_body(content = AppraisalForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Appraisal finished", body = AppraisalResult),
        (status = 400, description = "Malformed form", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid API key", body = crate::error::ErrorResponse),
        (status = 413, description = "Image too large", body = crate::error::ErrorResponse),
        (status = 422, description = "Image rejected", body = crate::error::ErrorResponse),
        (status = 503, description = "Too many concurrent appraisals", body = crate::error::ErrorResponse),
    ),
    security(
        (),
        ("api_key" = [])
    )
)]
pub async fn create_appraisal(
    auth: OptionalApiKeyAuth,
    service: web::Data<AppraisalService>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let (image, request) = parse_submission(&mut payload, &service, auth).await?;

    info!(
        "Appraisal requested: file={}, size={}, category={:?}",
        image.filename,
        image.bytes.len(),
        request.category
    );

    let result = service.create_appraisal_from_upload(image, request).await?;
    Ok(HttpResponse::Created().json(result))
}

/// Submit an image for background appraisal.
///
/// Returns immediately; poll the status endpoint for progress.
#[utoipa::path(
    post,
    path = "/api/v1/appraisals/submit",
    tag = "Appraisals",
    request_body(content = AppraisalForm, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Appraisal accepted", body = SubmissionResponse),
        (status = 400, description = "Malformed form", body = crate::error::ErrorResponse),
        (status = 413, description = "Image too large", body = crate::error::ErrorResponse),
        (status = 422, description = "Image rejected", body = crate::error::ErrorResponse),
        (status = 503, description = "Too many concurrent appraisals", body = crate::error::ErrorResponse),
    ),
    security(
        (),
        ("api_key" = [])
    )
)]
pub async fn submit_appraisal(
    auth: OptionalApiKeyAuth,
    service: web::Data<AppraisalService>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let (image, request) = parse_submission(&mut payload, &service, auth).await?;
    let submission = service.submit_appraisal(image, request).await?;

    info!("Appraisal {} submitted", submission.appraisal_id);
    Ok(HttpResponse::Accepted().json(submission))
}

/// Get an appraisal by ID.
#[utoipa::path(
    get,
    path = "/api/v1/appraisals/{id}",
    tag = "Appraisals",
    params(
        ("id" = String, Path, description = "Appraisal ID")
    ),
    responses(
        (status = 200, description = "Appraisal", body = AppraisalResult),
        (status = 404, description = "Appraisal not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_appraisal(
    service: web::Data<AppraisalService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let result = service.get_appraisal(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// Get the processing status of an appraisal.
#[utoipa::path(
    get,
    path = "/api/v1/appraisals/{id}/status",
    tag = "Appraisals",
    params(
        ("id" = String, Path, description = "Appraisal ID")
    ),
    responses(
        (status = 200, description = "Current status", body = AppraisalStatusResponse),
        (status = 404, description = "Appraisal not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_appraisal_status(
    service: web::Data<AppraisalService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let status = service.get_status(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Cancel a pending or processing appraisal.
///
/// Appraisals submitted with an API key can only be cancelled with that key.
#[utoipa::path(
    delete,
    path = "/api/v1/appraisals/{id}",
    tag = "Appraisals",
    params(
        ("id" = String, Path, description = "Appraisal ID")
    ),
    responses(
        (status = 200, description = "Appraisal cancelled", body = AppraisalStatusResponse),
        (status = 400, description = "Appraisal already finished", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid API key", body = crate::error::ErrorResponse),
        (status = 404, description = "Appraisal not found", body = crate::error::ErrorResponse),
    ),
    security(
        (),
        ("api_key" = [])
    )
)]
pub async fn cancel_appraisal(
    auth: OptionalApiKeyAuth,
    service: web::Data<AppraisalService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let caller = auth.user.map(|u| u.id);
    let status = service.cancel_appraisal(&path.into_inner(), caller).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Appraisal counts per status.
#[utoipa::path(
    get,
    path = "/api/v1/appraisals/stats",
    tag = "Appraisals",
    responses(
        (status = 200, description = "Processing statistics", body = AppraisalStats),
    )
)]
pub async fn get_appraisal_stats(service: web::Data<AppraisalService>) -> AppResult<HttpResponse> {
    let stats = service.stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// List the caller's appraisals, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/appraisals",
    tag = "Appraisals",
    params(AppraisalListParams),
    responses(
        (status = 200, description = "Appraisal history", body = AppraisalListResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn list_appraisals(
    auth: ApiKeyAuth,
    service: web::Data<AppraisalService>,
    query: web::Query<AppraisalListParams>,
) -> AppResult<HttpResponse> {
    let response = service.list_user_appraisals(auth.user.id, &query).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Configure appraisal routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/appraisals")
            .route(web::get().to(list_appraisals))
            .route(web::post().to(create_appraisal)),
    )
    .service(web::resource("/appraisals/submit").route(web::post().to(submit_appraisal)))
    .service(web::resource("/appraisals/stats").route(web::get().to(get_appraisal_stats)))
    .service(
        web::resource("/appraisals/{id}")
            .route(web::get().to(get_appraisal))
            .route(web::delete().to(cancel_appraisal)),
    )
    .service(
        web::resource("/appraisals/{id}/status").route(web::get().to(get_appraisal_status)),
    );
}
