//! Authenticated REST client for the Metrika and AppMetrica APIs.
//!
//! Every service is addressed as `{host}/{kind}/{version}/{resource}`. The
//! client owns the retry policy and the translation of non-2xx responses into
//! [`ClientError`] values, so the typed services built on top of it only deal
//! with paths, parameters and payload shapes.

use log::{error, trace, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use strum_macros::{AsRefStr, Display};
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{API_VERSION, HTTP_STATUS_TOO_MANY_REQUESTS};
use crate::error_handling::{
    get_retry_strategy, ApiError, ClientError, InitializationError, RetryPolicy,
};

/// Query parameters of one request, in the order they are sent.
pub type QueryParams = Vec<(&'static str, String)>;

/// API service namespace, the first path segment after the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceKind {
    /// Counters, goals, log requests, applications.
    Management,
    /// Report tables.
    Stat,
}

/// HTTP client bound to one API service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Creates a client for `{host}/{kind}/v1`.
    ///
    /// # Arguments
    ///
    /// * `http` - Shared `reqwest` client (see `initialization::init_client`)
    /// * `host` - Scheme and host, e.g. `https://api-metrika.yandex.com`
    /// * `kind` - Service namespace
    /// * `token` - OAuth token; an empty token is treated as absent
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::BaseUrlError` if `host` does not form a
    /// valid URL.
    pub fn new(
        http: reqwest::Client,
        host: &str,
        kind: ServiceKind,
        token: Option<String>,
    ) -> Result<Self, InitializationError> {
        Self::with_version(http, host, kind, API_VERSION, token)
    }

    /// Creates a client for an explicit API version.
    pub fn with_version(
        http: reqwest::Client,
        host: &str,
        kind: ServiceKind,
        version: &str,
        token: Option<String>,
    ) -> Result<Self, InitializationError> {
        // trailing slash so relative resources join below the version segment
        let raw = format!("{}/{}/{}/", host.trim_end_matches('/'), kind, version);
        let base_url = Url::parse(&raw).map_err(|source| InitializationError::BaseUrlError {
            url: raw.clone(),
            source,
        })?;

        Ok(ApiClient {
            http,
            base_url,
            token: token.filter(|t| !t.is_empty()),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the default retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// `GET` a resource and decode its JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, ClientError> {
        let (url, body) = self.send(Method::GET, path, params, cancel).await?;
        decode(&url, &body)
    }

    /// `POST` to a resource (parameters in the query string) and decode its JSON body.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, ClientError> {
        let (url, body) = self.send(Method::POST, path, params, cancel).await?;
        decode(&url, &body)
    }

    /// `GET` a resource and return the raw body.
    pub async fn get_bytes(
        &self,
        path: &str,
        params: &[(&'static str, String)],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ClientError> {
        let (_, body) = self.send(Method::GET, path, params, cancel).await?;
        Ok(body)
    }

    /// Sends a request, retrying transport failures and 429 responses.
    ///
    /// # Returns
    ///
    /// The final URL (for error context) and the body of the 2xx response.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidUrl` if `path` cannot be joined onto the base URL
    /// - `ClientError::Api` for a non-2xx response with an API error body
    /// - `ClientError::Unrecognized` for any other non-2xx response
    /// - `ClientError::Transport` / `ClientError::RateLimited` once retries are exhausted
    /// - `ClientError::Cancelled` if `cancel` fires first
    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
        cancel: &CancellationToken,
    ) -> Result<(String, Vec<u8>), ClientError> {
        let mut url = self.base_url.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let retried = RetryIf::spawn(
            get_retry_strategy(&self.retry),
            || self.attempt(&method, &url),
            |e: &ClientError| {
                let retry = e.is_retriable();
                if retry {
                    warn!("Retrying {} {}: {}", method, url, e);
                }
                retry
            },
        );

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            result = retried => result?,
        };
        Ok((url.to_string(), body))
    }

    async fn attempt(&self, method: &Method, url: &Url) -> Result<Vec<u8>, ClientError> {
        trace!("{} {}", method, url);

        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let transport = |source| ClientError::Transport {
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if status.is_success() {
            return Ok(body.to_vec());
        }
        if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited {
                url: url.to_string(),
            });
        }

        match serde_json::from_slice::<ApiError>(&body) {
            Ok(api_error) => {
                error!("{}", api_error);
                Err(ClientError::Api(api_error))
            }
            Err(_) => Err(ClientError::Unrecognized {
                status: status.as_u16(),
                url: url.to_string(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}
