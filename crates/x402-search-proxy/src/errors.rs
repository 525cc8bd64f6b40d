use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;
use x402_search_core::{
    envelope::{ErrorEnvelope, ErrorKind},
    types::AnyJson,
};

/// Every way the proxy can fail a request. Rendered as an [`ErrorEnvelope`].
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),
    #[error("Query is required")]
    MissingQuery,
    #[error("Search provider API key not configured")]
    MissingApiKey,
    /// The provider answered with something other than 200 or 402.
    #[error("Search provider returned {status}")]
    UpstreamStatus { status: StatusCode, body: AnyJson },
    /// The provider could not be reached. `message` must already be scrubbed of the credential.
    #[error("Could not reach search provider: {message}")]
    UpstreamUnreachable {
        cause: &'static str,
        message: String,
        upstream_url: String,
        timeout_secs: u64,
    },
}

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::InvalidBody(_) | ProxyError::MissingQuery => ErrorKind::ValidationError,
            ProxyError::MissingApiKey => ErrorKind::ConfigurationError,
            ProxyError::UpstreamStatus { .. } => ErrorKind::ProviderError,
            ProxyError::UpstreamUnreachable { .. } => ErrorKind::TransportError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidBody(_) | ProxyError::MissingQuery => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let builder = ErrorEnvelope::builder()
            .status(self.status().as_u16())
            .kind(self.kind());

        match self {
            ProxyError::InvalidBody(reason) => builder
                .error("Invalid JSON body")
                .message(reason.clone())
                .build(),
            ProxyError::MissingQuery => builder.error("Query is required").build(),
            ProxyError::MissingApiKey => builder
                .error("Search provider API key not configured")
                .build(),
            ProxyError::UpstreamStatus { status, body } => builder
                .error(if status.is_server_error() {
                    "Search provider server error"
                } else {
                    "Unexpected response from search provider"
                })
                .message(format!("Search provider returned {status}"))
                .details(json!({ "upstreamStatus": status.as_u16(), "body": body }))
                .build(),
            ProxyError::UpstreamUnreachable {
                cause,
                message,
                upstream_url,
                timeout_secs,
            } => builder
                .error("Could not reach search provider")
                .message(message.clone())
                .details(json!({
                    "cause": cause,
                    "upstreamUrl": upstream_url,
                    "timeoutSecs": timeout_secs,
                }))
                .build(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let envelope = self.envelope();

        if status.is_server_error() {
            tracing::error!(kind = %envelope.kind_or_unknown(), error = %envelope.error, message = envelope.message.as_deref(), "Request failed");
        } else {
            tracing::info!(kind = %envelope.kind_or_unknown(), error = %envelope.error, "Request rejected");
        }

        (status, Json(envelope)).into_response()
    }
}
