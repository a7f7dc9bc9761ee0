//! OpenRouter-style catalog fetcher: `GET {base}/models[?category=...]` with a bearer key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{CatalogError, CatalogSource, ModelDescriptor};

/// Fetches a URL with a bearer credential and returns the body. Abstraction for testing.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET the URL; non-2xx statuses are errors.
    async fn get(&self, url: &str, bearer: &str) -> Result<String, String>;
}

/// Reqwest-based HTTP client.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, bearer: &str) -> Result<String, String> {
        let body = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .text()
            .await
            .map_err(|e| e.to_string())?;
        Ok(body)
    }
}

#[derive(Deserialize)]
struct ModelsEnvelope {
    data: Vec<ModelDescriptor>,
}

/// Lists models from an OpenRouter-compatible `/models` endpoint.
pub struct OpenRouterCatalog {
    base_url: String,
    api_key: Option<String>,
    http_client: Arc<dyn HttpClient>,
}

impl OpenRouterCatalog {
    /// Create with the reqwest client and a 30s timeout.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(
            base_url,
            api_key,
            Arc::new(ReqwestHttpClient::new(Duration::from_secs(30))),
        )
    }

    /// Create with a custom HTTP client.
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: Option<String>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http_client,
        }
    }

    pub fn from_settings(settings: &env_config::Settings) -> Self {
        Self::with_client(
            settings.base_url.clone(),
            settings.api_key.clone(),
            Arc::new(ReqwestHttpClient::new(settings.request_timeout)),
        )
    }

    fn models_url(&self, category: Option<&str>) -> Result<String, CatalogError> {
        let base = format!("{}/models", self.base_url);
        match category {
            Some(tag) => reqwest::Url::parse_with_params(&base, &[("category", tag)])
                .map(String::from)
                .map_err(|e| CatalogError::Request(format!("invalid catalog url {}: {}", base, e))),
            None => Ok(base),
        }
    }
}

#[async_trait]
impl CatalogSource for OpenRouterCatalog {
    async fn list_models(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<ModelDescriptor>, CatalogError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CatalogError::MissingCredential)?;
        let url = self.models_url(category)?;
        debug!(url = %url, category = ?category, "fetching model catalog");

        let body = self
            .http_client
            .get(&url, api_key)
            .await
            .map_err(CatalogError::Request)?;
        let envelope: ModelsEnvelope =
            serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))?;

        debug!(count = envelope.data.len(), category = ?category, "model catalog fetched");
        Ok(envelope.data)
    }
}
