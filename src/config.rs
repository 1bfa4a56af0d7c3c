//! Client configuration.
//!
//! Everything the HTTP client needs lives in [`ClientConfig`], built via
//! [`ClientConfigBuilder`]. Callers set only what they care about; the
//! builder validates the base URL and timeouts once, so the client itself
//! never has to.

use crate::error::AugmenterError;
use serde::{Deserialize, Serialize};

/// Base URL used when nothing else is configured (the backend's dev server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable read by [`ClientConfig::from_env`].
pub const API_URL_ENV: &str = "PDF_AUGMENTER_API_URL";

/// Configuration for the backend client.
///
/// # Example
/// ```rust
/// use pdf_augmenter::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://augmenter.internal:8000/")
///     .request_timeout_secs(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "http://augmenter.internal:8000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root, without trailing slash. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Whole-request timeout in seconds. Default: `None` (transport default).
    ///
    /// Extraction runs description generation for every item server-side
    /// and routinely takes minutes on long documents, so no timeout is
    /// imposed unless asked for.
    pub request_timeout_secs: Option<u64>,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Timeout for downloading a PDF given as a URL. Default: 120.
    pub download_timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            connect_timeout_secs: 10,
            download_timeout_secs: 120,
            user_agent: concat!("pdf-augmenter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the base URL taken from `PDF_AUGMENTER_API_URL` when set.
    pub fn from_env() -> Result<Self, AugmenterError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            builder = builder.base_url(url);
        }
        builder.build()
    }

    /// Join an endpoint path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.config.base_url = url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, AugmenterError> {
        let c = &self.config;
        let parsed = reqwest::Url::parse(&c.base_url).map_err(|e| {
            AugmenterError::InvalidConfig(format!("base URL '{}' is invalid: {e}", c.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AugmenterError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(AugmenterError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.connect_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(AugmenterError::InvalidConfig(
                "connect and download timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
