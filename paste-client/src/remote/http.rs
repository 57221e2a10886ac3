//! HTTP remote talking to the omg.lol pastebin API.
//!
//! Requests go to `{base_url}{address}/pastebin` with a bearer token.
//! Response mapping:
//! - 2xx with `request.success = true` - decoded body
//! - 2xx with `request.success = false` - remote error with the envelope status
//! - 3xx, 4xx, 5xx - remote error with the message from the error body,
//!   or the reason phrase when the body is unreadable
//! - request not sent, timeout, body not read - client error (transport)
//! - body not matching the expected shape - client error (decode)

use super::PasteRemote;
use async_trait::async_trait;
use paste_types::api::{
    ApiError, ApiPaste, ApiResponse, ApiResult, GetPastebinResponse, PostPasteData,
    PostPasteResponse,
};
use paste_types::{ClientFault, Outcome, Paste};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Base URL of the public API.
pub const DEFAULT_BASE_URL: &str = "https://api.omg.lol/address/";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors building an [`HttpRemote`].
#[derive(Debug, Error)]
pub enum HttpRemoteError {
    /// Base URL is malformed or cannot carry a path.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// HTTP client could not be initialised.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration for [`HttpRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRemoteConfig {
    /// Base URL, account address and `pastebin` are appended to it.
    pub base_url: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpRemoteConfig {
    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Remote backed by the pastebin HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpRemote {
    /// Create a remote from its configuration.
    pub fn new(config: HttpRemoteConfig) -> Result<Self, HttpRemoteError> {
        let invalid = |reason: String| HttpRemoteError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason,
        };

        let base_url = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// URL of the pastebin collection of `address`.
    ///
    /// The address is percent-encoded as a single path segment.
    pub fn pastebin_url(&self, address: &str) -> Result<Url, ClientFault> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientFault::InvalidInput(format!("base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push(address)
            .push("pastebin");
        Ok(url)
    }

    /// Send a request and map the response per the module rules.
    async fn execute<T, R>(
        &self,
        request: RequestBuilder,
        extract: impl FnOnce(T) -> R + Send,
    ) -> Outcome<R>
    where
        T: DeserializeOwned + ApiResponse,
    {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::client_error(ClientFault::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            tracing::debug!("Pastebin API answered {}: {}", status, message);
            return Outcome::remote_error(status.as_u16(), message);
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Outcome::client_error(ClientFault::Transport(e.to_string())),
        };

        let envelope: ApiResult<serde_json::Value> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) => return Outcome::client_error(ClientFault::Decode(e.to_string())),
        };

        if !envelope.request.success {
            let message = serde_json::from_value::<ApiError>(envelope.response)
                .map(|error| error.message().to_string())
                .unwrap_or_else(|_| "request was not successful".to_string());
            return Outcome::remote_error(envelope.request.status_code, message);
        }

        match serde_json::from_value::<T>(envelope.response) {
            Ok(data) => {
                tracing::debug!("Pastebin API: {}", data.message());
                Outcome::Success(extract(data))
            }
            Err(e) => Outcome::client_error(ClientFault::Decode(e.to_string())),
        }
    }
}

/// Message of an error response, falling back to the reason phrase.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let fallback = || status.canonical_reason().unwrap_or("Unknown status").to_string();

    match response.bytes().await {
        Ok(body) => serde_json::from_slice::<ApiResult<ApiError>>(&body)
            .map(|result| result.response.message)
            .unwrap_or_else(|_| fallback()),
        Err(_) => fallback(),
    }
}

#[async_trait]
impl PasteRemote for HttpRemote {
    async fn get_pastebin(&self, address: &str, api_key: &str) -> Outcome<Vec<Paste>> {
        let url = match self.pastebin_url(address) {
            Ok(url) => url,
            Err(fault) => return Outcome::client_error(fault),
        };

        let request = self.http.get(url).bearer_auth(api_key);
        self.execute(request, |body: GetPastebinResponse| {
            body.pastebin
                .into_iter()
                .map(ApiPaste::into_paste)
                .collect()
        })
        .await
    }

    async fn create_or_update_paste(
        &self,
        title: &str,
        content: &str,
        address: &str,
        api_key: &str,
    ) -> Outcome<String> {
        let url = match self.pastebin_url(address) {
            Ok(url) => url,
            Err(fault) => return Outcome::client_error(fault),
        };

        let request = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&PostPasteData {
                title: title.to_string(),
                content: content.to_string(),
            });
        self.execute(request, |body: PostPasteResponse| body.title)
            .await
    }
}
