//! Landmark extraction delegated to a detection service over HTTP.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::RemoteExtractorConfig;
use crate::data::resolve_path;
use crate::error::{AlignError, AlignResult};
use crate::pipeline::{ExtractorFactory, ImageHandle, Landmark, SignalExtractor};
use crate::server::protocol::{ErrorResponse, HealthResponse, LandmarkResponse, IMAGE_FIELD};

pub struct RemoteExtractor {
    client: Client,
    endpoint: String,
}

impl RemoteExtractor {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SignalExtractor for RemoteExtractor {
    fn name(&self) -> &str {
        "remote"
    }

    async fn extract(&self, image: &ImageHandle) -> AlignResult<Option<Landmark>> {
        let path = resolve_path(image)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AlignError::decode(image.as_str(), e))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        debug!(endpoint = %self.endpoint, bytes = bytes.len(), "Uploading image for landmark detection");
        let form = Form::new().part(IMAGE_FIELD, Part::bytes(bytes).file_name(file_name));
        let response = self
            .client
            .post(format!("{}/landmark", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AlignError::DetectorUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let reason = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "rejected by detection service".to_string());
            return Err(AlignError::decode(image.as_str(), reason));
        }
        if !status.is_success() {
            return Err(AlignError::DetectorUnavailable(format!(
                "detection service returned {status}"
            )));
        }

        let body: LandmarkResponse = response
            .json()
            .await
            .map_err(|e| AlignError::DetectorUnavailable(format!("malformed response: {e}")))?;

        body.landmark
            .map(Landmark::checked)
            .transpose()
            .map_err(|e| AlignError::DetectorUnavailable(format!("malformed landmark: {e}")))
    }
}

/// Connects to the detection service; the health probe doubles as the
/// availability check.
pub struct RemoteDetectorFactory {
    config: RemoteExtractorConfig,
}

impl RemoteDetectorFactory {
    pub fn new(config: RemoteExtractorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ExtractorFactory for RemoteDetectorFactory {
    fn backend(&self) -> &str {
        "remote"
    }

    async fn initialize(&self) -> AlignResult<Arc<dyn SignalExtractor>> {
        let client = Client::builder()
            .timeout(Duration::from_millis(self.config.request_timeout_ms))
            .build()
            .map_err(|e| AlignError::DetectorUnavailable(format!("http client: {e}")))?;
        let extractor = RemoteExtractor::new(client, self.config.endpoint.clone());

        let health = extractor
            .client
            .get(format!("{}/health", extractor.endpoint))
            .send()
            .await
            .map_err(|e| AlignError::DetectorUnavailable(format!("health probe failed: {e}")))?;
        if !health.status().is_success() {
            return Err(AlignError::DetectorUnavailable(format!(
                "health probe returned {}",
                health.status()
            )));
        }
        let health: HealthResponse = health
            .json()
            .await
            .map_err(|e| AlignError::DetectorUnavailable(format!("malformed health response: {e}")))?;

        info!(
            endpoint = %extractor.endpoint,
            remote_extractor = %health.extractor,
            "Connected to detection service"
        );
        Ok(Arc::new(extractor))
    }
}
