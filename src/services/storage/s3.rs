//! S3 storage backend.
//!
//! Works against AWS S3 and S3-compatible services such as MinIO.

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::{S3Config, StorageKind};

use super::{StorageBackend, StorageError, StoredObject, UploadPolicy, is_safe_key};

pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base_url: String,
    policy: UploadPolicy,
}

impl S3Storage {
    /// Create the client and make sure the bucket exists.
    pub async fn new(config: &S3Config, policy: UploadPolicy) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            &config.access_key,
            config.secret_key.expose_secret(),
            None,
            None,
            "snapvalue",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
            public_base_url: public_base_url(config),
            policy,
        };

        storage.ensure_bucket_exists().await?;

        info!("S3 storage initialized: bucket={}", config.bucket);

        Ok(storage)
    }

    async fn ensure_bucket_exists(&self) -> Result<(), StorageError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if !service_error.is_not_found() {
                    return Err(StorageError::Backend(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )));
                }

                info!("Creating S3 bucket '{}'", self.bucket);
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .map_err(|e| StorageError::Backend(format!("Failed to create bucket: {}", e)))?;
                Ok(())
            }
        }
    }
}

/// Public URL prefix: explicit setting, else `{endpoint}/{bucket}`, else the
/// virtual-hosted AWS address.
fn public_base_url(config: &S3Config) -> String {
    if let Some(ref base) = config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    match config.endpoint {
        Some(ref endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
        None => format!(
            "https://{}.s3.{}.amazonaws.com",
            config.bucket, config.region
        ),
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    fn kind(&self) -> StorageKind {
        StorageKind::Cloud
    }

    fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        if !is_safe_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to upload to S3: {}", e)))?;

        Ok(StoredObject {
            reference: format!("s3://{}/{}", self.bucket, key),
            public_url: Some(format!("{}/{}", self.public_base_url, key)),
            size: bytes.len() as u64,
        })
    }
}
