//! HTTP client for an external analysis service.
//!
//! The service exposes `POST {endpoint}/vision`, `/market` and `/price`, each
//! taking and returning the JSON form of the stage types.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::models::{
    Embeddings, ExtractedFeatures, ImageInput, MarketAnalysis, MarketOptions, PriceEstimate,
    PriceOptions, VisionAnalysis,
};

use super::{AnalysisError, MarketBackend, PriceBackend, VisionBackend};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RemoteAnalysisClient {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct VisionRequest<'a> {
    reference: &'a str,
    content_type: &'a str,
    image_base64: String,
}

#[derive(Serialize)]
struct MarketRequest<'a> {
    embeddings: &'a Embeddings,
    extracted_features: &'a ExtractedFeatures,
    category: Option<&'a str>,
    options: &'a MarketOptions,
}

#[derive(Serialize)]
struct PriceRequest<'a> {
    vision: &'a VisionAnalysis,
    market: &'a MarketAnalysis,
    condition: Option<&'a str>,
    options: &'a PriceOptions,
}

impl RemoteAnalysisClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, stage: &str) -> String {
        format!("{}/{}", self.endpoint, stage)
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned + Send>(
        &self,
        stage: &str,
        body: &B,
    ) -> Result<R, AnalysisError> {
        let url = self.url(stage);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(format!("{:?}", self.timeout))
                } else {
                    AnalysisError::Unavailable(format!("{}: {}", url, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Unavailable(format!(
                "{} returned {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::Unavailable(format!("{}: {}", url, e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| AnalysisError::Malformed(format!("{} response: {}", stage, e)))
    }
}

#[async_trait]
impl VisionBackend for RemoteAnalysisClient {
    async fn analyze_vision(&self, image: &ImageInput) -> Result<VisionAnalysis, AnalysisError> {
        let request = VisionRequest {
            reference: &image.reference,
            content_type: &image.content_type,
            image_base64: BASE64.encode(&image.bytes),
        };
        self.post("vision", &request).await
    }
}

#[async_trait]
impl MarketBackend for RemoteAnalysisClient {
    async fn analyze_market(
        &self,
        embeddings: &Embeddings,
        features: &ExtractedFeatures,
        category: Option<&str>,
        options: &MarketOptions,
    ) -> Result<MarketAnalysis, AnalysisError> {
        let request = MarketRequest {
            embeddings,
            extracted_features: features,
            category,
            options,
        };
        self.post("market", &request).await
    }
}

#[async_trait]
impl PriceBackend for RemoteAnalysisClient {
    async fn calculate_price(
        &self,
        vision: &VisionAnalysis,
        market: &MarketAnalysis,
        condition: Option<&str>,
        options: &PriceOptions,
    ) -> Result<PriceEstimate, AnalysisError> {
        let request = PriceRequest {
            vision,
            market,
            condition,
            options,
        };
        self.post("price", &request).await
    }
}
