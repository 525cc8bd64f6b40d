//! HTTP transport abstraction.
//!
//! The search client only needs to send one buffered request and read one buffered response.
//! [`Transport`] captures that so payment handling can wrap any HTTP stack, and so tests can
//! script responses without a network.

use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};

/// Sends a buffered HTTP request and returns the buffered response.
pub trait Transport {
    type Error: std::error::Error;

    fn send(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, Self::Error>>;
}

impl<T: Transport> Transport for &T {
    type Error = T::Error;

    fn send(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, Self::Error>> {
        (**self).send(request)
    }
}

/// Copy a buffered request, so it can be sent again.
pub fn clone_request(request: &Request<Bytes>) -> Request<Bytes> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

/// Default time allowed for one round trip to the proxy.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Could not connect: {0}")]
    Connect(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use super::*;

    /// [`Transport`] backed by a [`reqwest::Client`], with a per-request timeout.
    #[derive(Debug, Clone, bon::Builder)]
    pub struct ReqwestTransport {
        #[builder(default)]
        pub client: reqwest::Client,
        #[builder(default = DEFAULT_TIMEOUT)]
        pub timeout: Duration,
    }

    impl Default for ReqwestTransport {
        fn default() -> Self {
            ReqwestTransport::builder().build()
        }
    }

    impl ReqwestTransport {
        fn map_error(&self, err: reqwest::Error) -> TransportError {
            if err.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else if err.is_connect() {
                TransportError::Connect(err.to_string())
            } else if err.is_builder() {
                TransportError::InvalidRequest(err.to_string())
            } else {
                TransportError::Other(err.to_string())
            }
        }
    }

    impl Transport for ReqwestTransport {
        type Error = TransportError;

        async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Self::Error> {
            let mut request = reqwest::Request::try_from(request)
                .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
            *request.timeout_mut() = Some(self.timeout);

            #[cfg(feature = "tracing")]
            tracing::debug!(method = %request.method(), url = %request.url(), "Sending request");

            let response = self
                .client
                .execute(request)
                .await
                .map_err(|err| self.map_error(err))?;

            let mut builder = Response::builder()
                .status(response.status())
                .version(response.version());
            if let Some(headers) = builder.headers_mut() {
                *headers = response.headers().clone();
            }
            let body = response.bytes().await.map_err(|err| self.map_error(err))?;

            builder
                .body(body)
                .map_err(|err| TransportError::Other(err.to_string()))
        }
    }
}
