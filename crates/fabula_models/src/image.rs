//! Image-generation service client.
//!
//! The service exposes an asynchronous job API:
//!
//! - `POST {base_url}/generate/async` with `{"prompt": ...}` answers `{"id": ...}`
//! - `GET {base_url}/generate/status/{id}` answers
//!   `{"done", "faulted", "queue_position", "generations": [{"img": url}]}`
//!
//! Finished images are served from short-lived URLs and must be downloaded
//! with [`fetch`](fabula_interface::ImageService::fetch) before they expire.

use crate::ImageServiceConfig;
use crate::dto::{ImageStatusResponse, ImageSubmitRequest, ImageSubmitResponse};
use async_trait::async_trait;
use fabula_core::{FetchedImage, ImageJobStatus};
use fabula_error::{FabulaResult, ImageServiceError, ImageServiceErrorKind};
use fabula_interface::ImageService;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP client for the image service.
#[derive(Debug, Clone)]
pub struct ImageServiceClient {
    client: Client,
    config: ImageServiceConfig,
}

impl ImageServiceClient {
    /// Build a client from configuration.
    pub fn new(config: ImageServiceConfig) -> FabulaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(*config.timeout_secs()))
            .build()
            .map_err(|e| ImageServiceError::new(ImageServiceErrorKind::Http(e.to_string())))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url().trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.api_key() {
            Some(key) => builder.header("apikey", key),
            None => builder,
        }
    }

    async fn check(response: Response) -> FabulaResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(ImageServiceError::new(ImageServiceErrorKind::Api { status, message }).into())
    }
}

#[async_trait]
impl ImageService for ImageServiceClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn submit(&self, prompt: &str) -> FabulaResult<String> {
        let body = ImageSubmitRequest {
            prompt: prompt.to_string(),
            models: self.config.model().iter().cloned().collect(),
        };

        let response = self
            .authorize(self.client.post(self.url("generate/async")).json(&body))
            .send()
            .await
            .map_err(|e| ImageServiceError::new(ImageServiceErrorKind::Http(e.to_string())))?;

        let submitted: ImageSubmitResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ImageServiceError::new(ImageServiceErrorKind::Deserialization(e.to_string()))
            })?;

        debug!(external_job_id = %submitted.id, "Image job submitted");
        Ok(submitted.id)
    }

    #[instrument(skip(self))]
    async fn poll(&self, external_job_id: &str) -> FabulaResult<ImageJobStatus> {
        let path = format!("generate/status/{}", external_job_id);
        let response = self
            .authorize(self.client.get(self.url(&path)))
            .send()
            .await
            .map_err(|e| ImageServiceError::new(ImageServiceErrorKind::Http(e.to_string())))?;

        let status: ImageStatusResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ImageServiceError::new(ImageServiceErrorKind::Deserialization(e.to_string()))
            })?;

        Ok(status.into())
    }

    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> FabulaResult<FetchedImage> {
        let transfer = |e: reqwest::Error| {
            ImageServiceError::new(ImageServiceErrorKind::Transfer(e.to_string()))
        };

        let response = self.client.get(url).send().await.map_err(transfer)?;
        if !response.status().is_success() {
            return Err(ImageServiceError::new(ImageServiceErrorKind::Transfer(format!(
                "status {} fetching {}",
                response.status(),
                url
            )))
            .into());
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/webp")
            .to_string();
        let data = response.bytes().await.map_err(transfer)?.to_vec();

        if data.is_empty() {
            return Err(ImageServiceError::new(ImageServiceErrorKind::Transfer(format!(
                "empty body fetching {}",
                url
            )))
            .into());
        }

        debug!(bytes = data.len(), %mime_type, "Image fetched");
        Ok(FetchedImage { data, mime_type })
    }
}
