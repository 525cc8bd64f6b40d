//! A [`Transport`] decorator that pays for `402 Payment Required` responses.

use bon::Builder;
use bytes::Bytes;
use http::{HeaderValue, Request, Response, StatusCode};
use x402_search_core::{
    transport::{PaymentRequired, X_PAYMENT},
    types::Base64EncodedHeader,
};

use crate::{
    networks::evm::EvmAddress,
    policy::{PaymentPolicy, SelectionError},
    schemes::exact_evm_signer::{ExactEvmSignError, ExactEvmSigner, WalletSigner},
    transport::{Transport, clone_request},
};

/// Wraps a transport so that a `402` is answered with a signed payment and the request is sent
/// exactly once more.
///
/// The second response is returned as is unless it is another `402`, which fails with
/// [`PaymentError::Unsatisfied`].
#[derive(Builder)]
pub struct PaymentTransport<'a, T: Transport, S: WalletSigner> {
    pub inner: T,
    pub signer: &'a S,
    /// Identity paying; `None` when no wallet is connected.
    pub payer: Option<EvmAddress>,
    #[builder(default)]
    pub policy: PaymentPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError<E> {
    #[error(transparent)]
    Transport(E),
    #[error("Invalid payment challenge: {0}")]
    InvalidChallenge(String),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("Signer error: {0}")]
    Signer(String),
    #[error("Failed to encode payment: {0}")]
    Encoding(#[from] x402_search_core::errors::Error),
    #[error("A payment is required but no wallet is connected")]
    WalletUnavailable,
    #[error("Payment required but not satisfied: {reason}")]
    Unsatisfied { reason: String },
}

impl<'a, T: Transport, S: WalletSigner> PaymentTransport<'a, T, S> {
    async fn pay(
        &self,
        challenge: &Response<Bytes>,
    ) -> Result<HeaderValue, PaymentError<T::Error>> {
        let payer = self.payer.ok_or(PaymentError::WalletUnavailable)?;
        let challenge: PaymentRequired = serde_json::from_slice(challenge.body())
            .map_err(|err| PaymentError::InvalidChallenge(err.to_string()))?;
        let selected = self.policy.select(&challenge.accepts)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            network = %selected.requirements.network,
            amount = %selected.amount,
            pay_to = %selected.pay_to.redacted(),
            "Signing payment authorization"
        );

        let payment = ExactEvmSigner {
            signer: self.signer,
            policy: &self.policy,
        }
        .sign(payer, &selected)
        .await
        .map_err(|err| match err {
            ExactEvmSignError::SignerError(err) => PaymentError::Signer(err.to_string()),
            other @ ExactEvmSignError::MissingEip712Domain => {
                PaymentError::InvalidChallenge(other.to_string())
            }
            ExactEvmSignError::SystemTimeError(err) => PaymentError::Signer(err.to_string()),
        })?;

        let header = Base64EncodedHeader::try_from(&payment)?;
        HeaderValue::from_str(header.as_str())
            .map_err(|err| PaymentError::InvalidChallenge(err.to_string()))
    }
}

impl<'a, T: Transport, S: WalletSigner> Transport for PaymentTransport<'a, T, S> {
    type Error = PaymentError<T::Error>;

    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Self::Error> {
        let mut retry = clone_request(&request);

        let response = self
            .inner
            .send(request)
            .await
            .map_err(PaymentError::Transport)?;
        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Ok(response);
        }

        let payment = self.pay(&response).await?;
        retry.headers_mut().insert(X_PAYMENT, payment);

        #[cfg(feature = "tracing")]
        tracing::debug!("Resending request with payment");

        let response = self
            .inner
            .send(retry)
            .await
            .map_err(PaymentError::Transport)?;
        if response.status() == StatusCode::PAYMENT_REQUIRED {
            let reason = rejection_reason(response.body());

            #[cfg(feature = "tracing")]
            tracing::warn!(%reason, "Payment was not accepted");

            return Err(PaymentError::Unsatisfied { reason });
        }

        Ok(response)
    }
}

/// The provider's reason for refusing a payment: the challenge's `error`, else the raw body.
fn rejection_reason(body: &Bytes) -> String {
    if let Ok(PaymentRequired {
        error: Some(error), ..
    }) = serde_json::from_slice::<PaymentRequired>(body)
    {
        return error;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "Payment required".to_string()
    } else {
        text.chars().take(200).collect()
    }
}
