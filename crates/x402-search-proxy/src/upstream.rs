//! HTTP client for the search provider.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use url::Url;
use x402_search_core::{
    search::UpstreamSearchRequest,
    transport::{X_PAYMENT, X_PAYMENT_RESPONSE},
};

use crate::config::{ApiKey, ProxyConfig};

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

/// What the provider answered, unparsed.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub payment_response: Option<HeaderValue>,
}

/// The provider could not be reached or did not send a complete answer.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Search provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Could not connect to search provider: {0}")]
    Connect(String),
    #[error("Failed to read search provider response: {0}")]
    Body(String),
    #[error("Search provider request failed: {0}")]
    Request(String),
}

impl UpstreamError {
    /// Short machine-readable cause, reported in error details.
    pub fn cause(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Body(_) => "body",
            UpstreamError::Request(_) => "request",
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        let (is_timeout, is_connect, is_body) =
            (err.is_timeout(), err.is_connect(), err.is_body() || err.is_decode());
        // The URL is reported separately; request headers never appear in reqwest errors.
        let message = err.without_url().to_string();
        if is_timeout {
            UpstreamError::Timeout(timeout)
        } else if is_connect {
            UpstreamError::Connect(message)
        } else if is_body {
            UpstreamError::Body(message)
        } else {
            UpstreamError::Request(message)
        }
    }
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Self {
        UpstreamClient {
            client: reqwest::Client::new(),
            url: config.upstream_url.clone(),
            timeout: config.upstream_timeout,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one search, forwarding the caller's payment header untouched.
    pub async fn search(
        &self,
        api_key: &ApiKey,
        body: &UpstreamSearchRequest,
        payment: Option<&HeaderValue>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut request = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .header(AUTHORIZATION, format!("Bearer {}", api_key.expose()))
            .json(body);
        if let Some(payment) = payment {
            request = request.header(X_PAYMENT, payment.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(err, self.timeout))?;

        let status = response.status();
        let payment_response = response.headers().get(X_PAYMENT_RESPONSE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|err| UpstreamError::from_reqwest(err, self.timeout))?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "Search provider answered");

        Ok(UpstreamResponse {
            status,
            body,
            payment_response,
        })
    }
}
