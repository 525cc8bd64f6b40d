use x402_search_core::envelope::{ErrorEnvelope, ErrorKind};

use crate::{payment_transport::PaymentError, transport::TransportError};

/// Every way [`crate::client::SearchClient::search`] can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search request: {0}")]
    Validation(String),
    #[error("Search service is not configured: {0}")]
    Configuration(String),
    #[error("No wallet connected")]
    WalletUnavailable,
    #[error("Payment was rejected: {0}")]
    PaymentRejected(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Payment required but not satisfied: {0}")]
    PaymentRequiredUnsatisfied(String),
    #[error("Transport error: {message}")]
    Transport { timeout: bool, message: String },
    #[error("Search provider error ({status}): {message}")]
    Provider {
        status: u16,
        message: String,
        envelope: Option<ErrorEnvelope>,
    },
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Validation(_) => ErrorKind::ValidationError,
            SearchError::Configuration(_) => ErrorKind::ConfigurationError,
            SearchError::WalletUnavailable => ErrorKind::WalletUnavailable,
            SearchError::PaymentRejected(_) => ErrorKind::PaymentRejected,
            SearchError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            SearchError::PaymentRequiredUnsatisfied(_) => ErrorKind::PaymentRequiredUnsatisfied,
            SearchError::Transport { .. } => ErrorKind::TransportError,
            SearchError::Provider { .. } => ErrorKind::ProviderError,
            SearchError::Unknown(_) => ErrorKind::UnknownError,
        }
    }

    /// One sentence suitable for showing to the person searching.
    pub fn user_message(&self) -> String {
        match self {
            SearchError::Validation(_) => "Please enter a search query.".to_string(),
            SearchError::Configuration(_) => {
                "The search service is not configured. Please try again later.".to_string()
            }
            SearchError::WalletUnavailable => {
                "No wallet detected. Please connect your wallet and try again.".to_string()
            }
            SearchError::PaymentRejected(_) => "Payment was rejected. Please try again.".to_string(),
            SearchError::InsufficientFunds(_) => {
                "Insufficient USDC balance. Please add funds to your wallet.".to_string()
            }
            SearchError::PaymentRequiredUnsatisfied(_) => {
                "Payment was required but not accepted. Please check your wallet setup.".to_string()
            }
            SearchError::Transport { timeout: true, .. } => {
                "The search timed out. Please try again.".to_string()
            }
            SearchError::Transport { .. } => {
                "Could not reach the search service. Please check your connection.".to_string()
            }
            SearchError::Provider { .. } => {
                "The search provider returned an error. Please try again.".to_string()
            }
            SearchError::Unknown(message) if !message.is_empty() => message.clone(),
            SearchError::Unknown(_) => "An unknown error occurred.".to_string(),
        }
    }

    /// Classify a failure reported by a wallet or by the provider from its text.
    pub fn from_failure_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let lower = text.to_lowercase();

        if lower.contains("rejected") || lower.contains("denied") {
            SearchError::PaymentRejected(text)
        } else if lower.contains("insufficient funds")
            || lower.contains("insufficient_funds")
            || lower.contains("insufficient balance")
        {
            SearchError::InsufficientFunds(text)
        } else if lower.contains("no wallet") {
            SearchError::WalletUnavailable
        } else {
            SearchError::Unknown(text)
        }
    }

    /// Map an error envelope returned by the proxy.
    pub fn from_envelope(status: u16, envelope: ErrorEnvelope) -> Self {
        let message = envelope.summary().to_string();
        match (status, envelope.kind_or_unknown()) {
            (400, _) | (_, ErrorKind::ValidationError) => SearchError::Validation(message),
            (_, ErrorKind::ConfigurationError) => SearchError::Configuration(message),
            (_, ErrorKind::TransportError) => {
                let timeout = envelope
                    .details
                    .as_ref()
                    .and_then(|details| details.get("cause"))
                    .and_then(|cause| cause.as_str())
                    == Some("timeout");
                SearchError::Transport { timeout, message }
            }
            _ => SearchError::Provider {
                status,
                message,
                envelope: Some(envelope),
            },
        }
    }
}

impl From<TransportError> for SearchError {
    fn from(err: TransportError) -> Self {
        SearchError::Transport {
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl<E: Into<SearchError>> From<PaymentError<E>> for SearchError {
    fn from(err: PaymentError<E>) -> Self {
        match err {
            PaymentError::Transport(err) => err.into(),
            PaymentError::WalletUnavailable => SearchError::WalletUnavailable,
            PaymentError::Signer(text) => SearchError::from_failure_text(text),
            PaymentError::Unsatisfied { reason } => match SearchError::from_failure_text(&reason) {
                SearchError::InsufficientFunds(reason) => SearchError::InsufficientFunds(reason),
                _ => SearchError::PaymentRequiredUnsatisfied(reason),
            },
            PaymentError::Selection(err) => SearchError::PaymentRequiredUnsatisfied(err.to_string()),
            PaymentError::InvalidChallenge(message) => SearchError::Provider {
                status: 402,
                message,
                envelope: None,
            },
            PaymentError::Encoding(err) => SearchError::Unknown(err.to_string()),
        }
    }
}
