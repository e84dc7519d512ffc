//! Actix-web extractors for API key authentication.
//!
//! The header value is wrapped in `SecretString` as soon as it is read and is
//! never logged.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use futures_util::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::API_KEY_HEADER;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::services::api_key::log_prefix;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing, empty or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_string()))
}

fn pool_from(req: &HttpRequest) -> Result<web::Data<DbPool>, AppError> {
    req.app_data::<web::Data<DbPool>>().cloned().ok_or_else(|| {
        AppError::Database("Database pool not configured".to_string())
    })
}

async fn authenticate(pool: &DbPool, key: &SecretString) -> Result<AuthenticatedUser, AppError> {
    let user = pool
        .find_user_by_api_key(key.expose_secret())
        .await?
        .ok_or_else(|| {
            debug!("Rejected unknown API key {}...", log_prefix(key.expose_secret()));
            AppError::Unauthorized("Invalid API key".to_string())
        })?;

    if !user.is_active {
        debug!("Rejected API key of inactive user {}", user.id);
        return Err(AppError::Unauthorized("User is inactive".to_string()));
    }

    Ok(user.into())
}

/// Extractor that requires a valid API key.
///
/// ```ignore
/// async fn protected_handler(auth: ApiKeyAuth) -> impl Responder {
///     // auth.user is the caller
/// }
/// ```
pub struct ApiKeyAuth {
    pub user: AuthenticatedUser,
}

impl FromRequest for ApiKeyAuth {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = pool_from(req);
        let provided = extract_secret_header(req, API_KEY_HEADER);

        Box::pin(async move {
            let pool = pool?;
            let key = provided.ok_or_else(|| {
                AppError::Unauthorized(format!(
                    "Missing API key. Provide {} header.",
                    API_KEY_HEADER
                ))
            })?;

            let user = authenticate(&pool, &key).await?;
            Ok(ApiKeyAuth { user })
        })
    }
}

/// Extractor for endpoints open to anonymous callers.
///
/// No header yields `user: None`; a header with a bad key is still rejected
/// so typos do not silently produce anonymous appraisals.
pub struct OptionalApiKeyAuth {
    pub user: Option<AuthenticatedUser>,
}

impl FromRequest for OptionalApiKeyAuth {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = pool_from(req);
        let provided = extract_secret_header(req, API_KEY_HEADER);

        Box::pin(async move {
            let Some(key) = provided else {
                return Ok(OptionalApiKeyAuth { user: None });
            };

            let pool = pool?;
            let user = authenticate(&pool, &key).await?;
            Ok(OptionalApiKeyAuth { user: Some(user) })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    use crate::db::tests::test_pool;

    #[actix_rt::test]
    async fn test_valid_key_resolves_user() {
        let pool = test_pool().await;
        let (user, key) = pool.insert_user("auth@example.com").await.unwrap();

        let req = TestRequest::default()
            .insert_header((API_KEY_HEADER, key.as_str()))
            .app_data(web::Data::new(pool))
            .to_http_request();

        let auth = ApiKeyAuth::extract(&req).await.unwrap();
        assert_eq!(auth.user.id, user.id);
    }

    #[actix_rt::test]
    async fn test_missing_and_invalid_keys() {
        let pool = test_pool().await;

        let req = TestRequest::default()
            .app_data(web::Data::new(pool.clone()))
            .to_http_request();
        assert!(matches!(
            ApiKeyAuth::extract(&req).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(OptionalApiKeyAuth::extract(&req).await.unwrap().user.is_none());

        let req = TestRequest::default()
            .insert_header((API_KEY_HEADER, "sv_not_a_real_key"))
            .app_data(web::Data::new(pool))
            .to_http_request();
        assert!(matches!(
            OptionalApiKeyAuth::extract(&req).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[actix_rt::test]
    async fn test_inactive_user_rejected() {
        let pool = test_pool().await;
        let (user, key) = pool.insert_user("gone@example.com").await.unwrap();
        pool.set_user_active(user.id, false).await.unwrap();

        let req = TestRequest::default()
            .insert_header((API_KEY_HEADER, key.as_str()))
            .app_data(web::Data::new(pool))
            .to_http_request();

        assert!(matches!(
            ApiKeyAuth::extract(&req).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
