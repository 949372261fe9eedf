//! reqwest-backed implementation of [`CompanionApi`]
//!
//! Every endpoint is resolved against the configured base URL by appending
//! path segments, so a base such as `https://host/prefix` keeps its prefix.
//! Request timeouts come from the reqwest client; there is no additional
//! application-level deadline.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::api::types::{WireMessage, WireSendResponse};
use crate::api::{ChatRequest, Companion, CompanionApi, CompanionInput, SendResponse};
use crate::config::Config;
use crate::error::{ConfidantError, Result};
use crate::message::Message;

/// HTTP client for the companion backend
///
/// # Examples
///
/// ```
/// use confidant::api::HttpCompanionApi;
/// use confidant::config::Config;
///
/// let api = HttpCompanionApi::from_config(&Config::default());
/// assert!(api.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct HttpCompanionApi {
    client: Client,
    base_url: Url,
    probe_segments: Vec<String>,
    admin_token: Option<String>,
}

impl HttpCompanionApi {
    /// Builds a client from the `api` and `health` sections of `config`
    ///
    /// # Errors
    ///
    /// Returns [`ConfidantError::Config`] if the base URL is invalid and
    /// [`ConfidantError::Http`] if the HTTP client cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api.base_url).map_err(|e| {
            ConfidantError::Config(format!("Invalid api.base_url {}: {}", config.api.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfidantError::Config(format!(
                "api.base_url must be a hierarchical URL: {}",
                config.api.base_url
            ))
            .into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .user_agent(concat!("confidant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfidantError::Http)?;

        let probe_segments = config
            .health
            .probe_path
            .trim_start_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();

        Ok(Self {
            client,
            base_url,
            probe_segments,
            admin_token: config.api.admin_token.clone(),
        })
    }

    /// Base URL all endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConfidantError::Config(format!("Invalid API base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments.iter().map(|s| s.as_ref()));
        Ok(url)
    }

    fn with_admin(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.admin_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Reads the body of a failed response for inclusion in an error message
async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    }
}

#[async_trait::async_trait]
impl CompanionApi for HttpCompanionApi {
    async fn probe(&self) -> Result<()> {
        let url = self.url_for(&self.probe_segments)?;
        tracing::debug!("Probing backend liveness: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ConfidantError::HealthCheck(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfidantError::HealthCheck(format!("HTTP {}", status)).into());
        }
        Ok(())
    }

    async fn list_companions(&self) -> Result<Vec<Companion>> {
        let url = self.url_for(&["api", "companions"])?;
        tracing::debug!("Fetching companions: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!("Failed to fetch companions: {}", e);
            ConfidantError::Api(format!("Failed to fetch companions: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ConfidantError::Api(describe_failure(response).await).into());
        }

        let companions: Vec<Companion> = response.json().await.map_err(|e| {
            ConfidantError::Api(format!("Failed to parse companion list: {}", e))
        })?;
        tracing::debug!("Fetched {} companions", companions.len());
        Ok(companions)
    }

    async fn get_companion(&self, id: &str) -> Result<Companion> {
        let url = self.url_for(&["api", "companions", id])?;
        tracing::debug!("Fetching companion: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            ConfidantError::Api(format!("Failed to fetch companion {}: {}", id, e))
        })?;

        match response.status() {
            // The id-keyed backend answers 400 for ids it cannot parse.
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(ConfidantError::CompanionNotFound(id.to_string()).into());
            }
            status if !status.is_success() => {
                return Err(ConfidantError::Api(describe_failure(response).await).into());
            }
            _ => {}
        }

        let companion = response
            .json()
            .await
            .map_err(|e| ConfidantError::Api(format!("Failed to parse companion: {}", e)))?;
        Ok(companion)
    }

    async fn create_companion(&self, input: &CompanionInput) -> Result<Companion> {
        let url = self.url_for(&["api", "companions"])?;
        tracing::debug!("Creating companion {}: {}", input.slug, url);

        let response = self
            .with_admin(self.client.post(url).json(input))
            .send()
            .await
            .map_err(|e| ConfidantError::Api(format!("Failed to create companion: {}", e)))?;

        if !response.status().is_success() {
            return Err(ConfidantError::Api(describe_failure(response).await).into());
        }

        let companion = response
            .json()
            .await
            .map_err(|e| ConfidantError::Api(format!("Failed to parse companion: {}", e)))?;
        Ok(companion)
    }

    async fn update_companion(&self, id: &str, input: &CompanionInput) -> Result<Companion> {
        let url = self.url_for(&["api", "companions", id])?;
        tracing::debug!("Updating companion {}: {}", id, url);

        let response = self
            .with_admin(self.client.put(url).json(input))
            .send()
            .await
            .map_err(|e| ConfidantError::Api(format!("Failed to update companion: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConfidantError::CompanionNotFound(id.to_string()).into());
        }
        if !response.status().is_success() {
            return Err(ConfidantError::Api(describe_failure(response).await).into());
        }

        let companion = response
            .json()
            .await
            .map_err(|e| ConfidantError::Api(format!("Failed to parse companion: {}", e)))?;
        Ok(companion)
    }

    async fn delete_companion(&self, id: &str) -> Result<()> {
        let url = self.url_for(&["api", "companions", id])?;
        tracing::debug!("Deleting companion {}: {}", id, url);

        let response = self
            .with_admin(self.client.delete(url))
            .send()
            .await
            .map_err(|e| ConfidantError::Api(format!("Failed to delete companion: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConfidantError::CompanionNotFound(id.to_string()).into());
        }
        if !response.status().is_success() {
            return Err(ConfidantError::Api(describe_failure(response).await).into());
        }
        Ok(())
    }

    async fn load_thread(&self, companion_id: &str, session_id: &str) -> Result<Vec<Message>> {
        let thread_error = |message: String| ConfidantError::ThreadLoad {
            companion_id: companion_id.to_string(),
            message,
        };

        let mut url = self.url_for(&["api", "chat", companion_id])?;
        url.query_pairs_mut().append_pair("session_id", session_id);
        tracing::debug!("Loading thread for companion {}", companion_id);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| thread_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(thread_error(describe_failure(response).await).into());
        }

        let wire: Vec<WireMessage> = response
            .json()
            .await
            .map_err(|e| thread_error(format!("invalid thread payload: {}", e)))?;
        Ok(wire.into_iter().map(Message::from).collect())
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<SendResponse> {
        let url = self.url_for(&["api", "chat"])?;
        tracing::debug!("Sending message to companion {}", request.companion_id);

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ConfidantError::Send(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConfidantError::Send(describe_failure(response).await).into());
        }

        let wire: WireSendResponse = response
            .json()
            .await
            .map_err(|e| ConfidantError::Send(format!("invalid send response: {}", e)))?;
        Ok(SendResponse::from(wire))
    }
}
