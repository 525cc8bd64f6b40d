//! The uniform error envelope returned by the proxy, and the closed set of error kinds.

use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::types::AnyJson;

/// Every way a search can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or invalid query.
    ValidationError,
    /// The proxy is missing its provider credential.
    ConfigurationError,
    /// A payment was sent but the provider still answered 402.
    PaymentRequiredUnsatisfied,
    /// The user declined to sign.
    PaymentRejected,
    /// The wallet cannot cover the payment.
    InsufficientFunds,
    /// No signing identity is available.
    WalletUnavailable,
    /// Network failure or timeout reaching the proxy or the provider.
    TransportError,
    /// The provider answered with an error or an unreadable body.
    ProviderError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::PaymentRequiredUnsatisfied => "PaymentRequiredUnsatisfied",
            ErrorKind::PaymentRejected => "PaymentRejected",
            ErrorKind::InsufficientFunds => "InsufficientFunds",
            ErrorKind::WalletUnavailable => "WalletUnavailable",
            ErrorKind::TransportError => "TransportError",
            ErrorKind::ProviderError => "ProviderError",
            ErrorKind::UnknownError => "UnknownError",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error body returned by the proxy for every non-success, non-402 outcome.
///
/// ```
/// use x402_search_core::envelope::{ErrorEnvelope, ErrorKind};
///
/// let envelope = ErrorEnvelope::builder()
///     .error("Query is required")
///     .status(400)
///     .kind(ErrorKind::ValidationError)
///     .build();
///
/// assert_eq!(
///     serde_json::to_value(&envelope).unwrap(),
///     serde_json::json!({ "error": "Query is required", "status": 400, "kind": "ValidationError" })
/// );
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[builder(into)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub message: Option<String>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AnyJson>,
}

impl ErrorEnvelope {
    /// The kind, or [`ErrorKind::UnknownError`] when the peer did not say.
    pub fn kind_or_unknown(&self) -> ErrorKind {
        self.kind.unwrap_or(ErrorKind::UnknownError)
    }

    /// A one-line description: the message if present, otherwise the error.
    pub fn summary(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.error)
    }
}
