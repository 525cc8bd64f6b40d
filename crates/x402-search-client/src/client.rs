use bon::Builder;
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode, header::CONTENT_TYPE};
use url::Url;
use x402_search_core::{
    envelope::ErrorEnvelope,
    search::{SearchRequest, SearchResponse},
    transport::{SettlementResponse, X_PAYMENT_RESPONSE},
    types::Base64EncodedHeader,
};

use crate::{
    errors::SearchError,
    networks::evm::EvmNetwork,
    payment_transport::PaymentTransport,
    policy::PaymentPolicy,
    schemes::exact_evm_signer::WalletSigner,
    transport::Transport,
};

/// Searches through the pay-per-search proxy, paying for each request when asked to.
///
/// ```no_run
/// use alloy::signers::local::PrivateKeySigner;
/// use x402_search_client::{client::SearchClient, transport::ReqwestTransport};
/// use x402_search_core::search::SearchRequest;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SearchClient::builder()
///     .transport(ReqwestTransport::default())
///     .endpoint("http://localhost:3000/search".parse()?)
///     .build();
///
/// let signer = PrivateKeySigner::random();
/// let request = SearchRequest::builder().query("x402 protocol").limit(5).build();
///
/// let success = client.search(&request, &signer).await?;
/// for result in &success.response.data.web {
///     println!("{} - {}", result.display_title(), result.url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Debug, Clone)]
pub struct SearchClient<T: Transport> {
    pub transport: T,
    /// The proxy's search route.
    pub endpoint: Url,
    #[builder(default)]
    pub policy: PaymentPolicy,
}

/// A successful search, with the payment confirmation when one was returned.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSuccess {
    pub response: SearchResponse,
    /// The raw `X-PAYMENT-RESPONSE` header value.
    pub payment_response: Option<Base64EncodedHeader>,
    /// The decoded `X-PAYMENT-RESPONSE`, if it could be decoded.
    pub settlement: Option<SettlementResponse>,
    /// The network payments are made on.
    pub network: EvmNetwork,
}

impl SearchSuccess {
    /// Block explorer link to the settlement transaction.
    pub fn transaction_url(&self) -> Option<String> {
        let settlement = self.settlement.as_ref()?;
        if settlement.transaction.is_empty() {
            return None;
        }
        let network = EvmNetwork::by_name(&settlement.network).unwrap_or(self.network);
        Some(network.transaction_url(&settlement.transaction))
    }
}

impl<T: Transport> SearchClient<T>
where
    T::Error: Into<SearchError>,
{
    /// Run one search, paying for it if the provider asks.
    ///
    /// At most two requests are made: the unpaid attempt, and the paid retry if the first
    /// answer is a `402`.
    pub async fn search<S: WalletSigner>(
        &self,
        request: &SearchRequest,
        signer: &S,
    ) -> Result<SearchSuccess, SearchError> {
        request
            .validate()
            .map_err(|err| SearchError::Validation(err.to_string()))?;

        let payer = signer.current_signing_identity().await;

        #[cfg(feature = "tracing")]
        match &payer {
            Some(payer) => tracing::debug!(payer = %payer.redacted(), "Searching with wallet"),
            None => tracing::debug!("Searching without a wallet, payments are unavailable"),
        }

        let body =
            serde_json::to_vec(request).map_err(|err| SearchError::Unknown(err.to_string()))?;
        let http_request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))
            .map_err(|err| SearchError::Unknown(err.to_string()))?;

        let transport = PaymentTransport::builder()
            .inner(&self.transport)
            .signer(signer)
            .maybe_payer(payer)
            .policy(self.policy.clone())
            .build();

        let response = transport.send(http_request).await?;
        self.read_response(response)
    }

    fn read_response(&self, response: Response<Bytes>) -> Result<SearchSuccess, SearchError> {
        let status = response.status();

        if status.is_success() {
            let search_response: SearchResponse = serde_json::from_slice(response.body())
                .map_err(|err| SearchError::Provider {
                    status: status.as_u16(),
                    message: format!("Malformed search response: {err}"),
                    envelope: None,
                })?;

            let payment_response = response
                .headers()
                .get(X_PAYMENT_RESPONSE)
                .and_then(|value| value.to_str().ok())
                .map(|value| Base64EncodedHeader(value.to_string()));
            let settlement = payment_response
                .as_ref()
                .and_then(|header| SettlementResponse::try_from(header).ok());

            #[cfg(feature = "tracing")]
            tracing::info!(
                results = search_response.data.web.len(),
                transaction = settlement.as_ref().map(|s| s.transaction.as_str()),
                "Search succeeded"
            );

            return Ok(SearchSuccess {
                response: search_response,
                payment_response,
                settlement,
                network: self.policy.network,
            });
        }

        if status == StatusCode::PAYMENT_REQUIRED {
            return Err(SearchError::PaymentRequiredUnsatisfied(
                "The provider still requires payment".to_string(),
            ));
        }

        let envelope = serde_json::from_slice::<ErrorEnvelope>(response.body()).unwrap_or_else(|_| {
            ErrorEnvelope::builder()
                .error(String::from_utf8_lossy(response.body()).trim().to_string())
                .status(status.as_u16())
                .build()
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(status = status.as_u16(), kind = ?envelope.kind, error = %envelope.error, "Search failed");

        Err(SearchError::from_envelope(status.as_u16(), envelope))
    }
}
