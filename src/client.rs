//! HTTP client for the augmenter backend.
//!
//! [`AugmenterBackend`] is the seam between the session state machine and
//! the network: the session only ever talks to an `Arc<dyn AugmenterBackend>`.
//! [`HttpBackend`] is the production implementation over `reqwest`; tests
//! drive the session with in-memory stubs.
//!
//! ## Failure normalisation
//!
//! Connection errors, timeouts, non-2xx statuses and bodies that do not
//! decode into the endpoint's item type all come back as transport-class
//! [`AugmenterError`]s. The backend's own error payload (`{"error": ...}`)
//! is logged at debug level and never surfaced as the user-facing message.
//! Nothing is retried.

use crate::config::ClientConfig;
use crate::error::AugmenterError;
use crate::input::{SelectedFile, PDF_MIME};
use crate::mode::Endpoint;
use crate::model::{decode_items, AskRequest, AskResponse, ExtractedItem};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name of the multipart field carrying the PDF.
pub const PDF_FIELD: &str = "pdf";

/// Operations the backend offers.
#[async_trait]
pub trait AugmenterBackend: Send + Sync {
    /// Upload `file` to an extraction endpoint and decode the returned items.
    ///
    /// Every returned item is of the kind `endpoint.extraction_mode()` names.
    async fn extract(
        &self,
        endpoint: Endpoint,
        file: &SelectedFile,
    ) -> Result<Vec<ExtractedItem>, AugmenterError>;

    /// Ask a question about an item, given only that item's description.
    async fn ask(&self, request: &AskRequest) -> Result<String, AugmenterError>;
}

/// [`AugmenterBackend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    /// Build a client from a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self, AugmenterError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AugmenterError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn transport_error(&self, endpoint: Endpoint, err: reqwest::Error) -> AugmenterError {
        AugmenterError::from_reqwest(
            endpoint.path(),
            err,
            self.config.request_timeout_secs,
            self.config.connect_timeout_secs,
        )
    }

    /// Turn a non-2xx response into `HttpStatus`, logging the body.
    async fn check_status(
        &self,
        endpoint: Endpoint,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AugmenterError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("{} answered {}: {}", endpoint, status, body);
        Err(AugmenterError::HttpStatus {
            endpoint: endpoint.path().to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl AugmenterBackend for HttpBackend {
    async fn extract(
        &self,
        endpoint: Endpoint,
        file: &SelectedFile,
    ) -> Result<Vec<ExtractedItem>, AugmenterError> {
        let mode = endpoint.extraction_mode().ok_or_else(|| {
            AugmenterError::Internal(format!("{endpoint} is not an extraction endpoint"))
        })?;

        let part = Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string())
            .mime_str(PDF_MIME)
            .map_err(|e| AugmenterError::Internal(e.to_string()))?;
        let form = Form::new().part(PDF_FIELD, part);

        let start = Instant::now();
        info!(
            "POST {} ({}, {} bytes)",
            endpoint,
            file.name(),
            file.content().len()
        );

        let response = self
            .client
            .post(self.config.url_for(endpoint.path()))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;
        let response = self.check_status(endpoint, response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;
        let items = decode_items(mode, body, endpoint.path())?;

        info!(
            "{}: {} {} in {:?}",
            endpoint,
            items.len(),
            mode,
            start.elapsed()
        );
        Ok(items)
    }

    async fn ask(&self, request: &AskRequest) -> Result<String, AugmenterError> {
        let endpoint = Endpoint::AskQuestion;
        debug!("POST {}: {:?}", endpoint, request.question);

        let response = self
            .client
            .post(self.config.url_for(endpoint.path()))
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;
        let response = self.check_status(endpoint, response).await?;

        let answer: AskResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;
        if answer.answer.is_empty() {
            warn!("{} returned an empty answer", endpoint);
        }
        Ok(answer.answer)
    }
}
