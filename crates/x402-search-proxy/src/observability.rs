//! Request correlation and payment diagnostics.
//!
//! Payment headers are decoded only to be logged. Addresses are shortened and signatures are
//! never logged. Nothing here can fail a request.

use axum::{extract::Request, middleware::Next, response::Response};
use bytes::Bytes;
use http::{HeaderName, HeaderValue};
use tracing::Instrument;
use uuid::Uuid;
use x402_search_core::{
    search::SearchResponse,
    transport::{DecodedPayment, PaymentRequired, SettlementResponse},
    types::Base64EncodedHeader,
};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Decimals of the USDC amounts carried in payments.
const USDC_DECIMALS: u8 = 6;

/// Correlation id of the request being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Give every request an id, attach it to the request's span and return it as `X-Request-Id`.
pub async fn correlate(mut request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(RequestId(id));

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Shorten an address to `0x1234…abcd`.
pub fn redact_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

/// The loggable part of a payment header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentSummary {
    pub scheme: Option<String>,
    pub network: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    pub value_usdc: Option<String>,
    pub valid_after: Option<u64>,
    pub valid_before: Option<u64>,
}

impl PaymentSummary {
    pub fn from_decoded(payment: &DecodedPayment) -> Self {
        let authorization = payment.authorization();
        let value = authorization.and_then(|a| a.value());

        PaymentSummary {
            scheme: payment.scheme.clone(),
            network: payment.network.clone(),
            from: authorization
                .and_then(|a| a.from.as_deref())
                .map(redact_address),
            to: authorization
                .and_then(|a| a.to.as_deref())
                .map(redact_address),
            value: value.map(|v| v.to_string()),
            value_usdc: value.map(|v| v.to_units(USDC_DECIMALS)),
            valid_after: authorization.and_then(|a| a.valid_after()),
            valid_before: authorization.and_then(|a| a.valid_before()),
        }
    }
}

/// Log an incoming payment header, and warn when it targets another network than configured.
pub fn log_payment(header: &HeaderValue, expected_network: &str, expected_asset: Option<&str>) {
    let decoded = header
        .to_str()
        .ok()
        .and_then(|raw| DecodedPayment::decode(raw).ok());

    let Some(decoded) = decoded else {
        tracing::info!(bytes = header.len(), "Payment header is not base64 JSON, forwarding as is");
        return;
    };

    let summary = PaymentSummary::from_decoded(&decoded);
    tracing::info!(
        x402_version = ?decoded.x402_version,
        scheme = summary.scheme.as_deref(),
        network = summary.network.as_deref(),
        from = summary.from.as_deref(),
        to = summary.to.as_deref(),
        value = summary.value.as_deref(),
        value_usdc = summary.value_usdc.as_deref(),
        valid_after = summary.valid_after,
        valid_before = summary.valid_before,
        expected_asset,
        "Forwarding payment"
    );

    if let Some(network) = summary.network.as_deref()
        && network != expected_network
    {
        tracing::warn!(
            network,
            expected_network,
            "Payment network does not match the expected network"
        );
    }
}

/// Log a `402` from the provider. A refused payment is logged next to what was sent.
pub fn log_challenge(body: &Bytes, payment: Option<&HeaderValue>) {
    let challenge = serde_json::from_slice::<PaymentRequired>(body).ok();
    let reason = challenge.as_ref().and_then(|c| c.error.as_deref());
    let requirement = challenge.as_ref().and_then(|c| c.accepts.first());

    let verification_failed = reason
        .map(|reason| reason.to_lowercase().contains("verification"))
        .unwrap_or(false);

    if payment.is_some() || verification_failed {
        let sent = payment
            .and_then(|header| header.to_str().ok())
            .and_then(|raw| DecodedPayment::decode(raw).ok())
            .map(|decoded| PaymentSummary::from_decoded(&decoded))
            .unwrap_or_default();

        tracing::warn!(
            reason,
            required_network = requirement.map(|r| r.network.as_str()),
            required_asset = requirement.map(|r| r.asset.as_str()),
            required_pay_to = requirement.map(|r| redact_address(&r.pay_to)),
            max_amount_required = requirement.map(|r| r.max_amount_required.to_string()),
            sent_network = sent.network.as_deref(),
            sent_from = sent.from.as_deref(),
            sent_to = sent.to.as_deref(),
            sent_value = sent.value.as_deref(),
            "Search provider refused the payment"
        );
    } else {
        tracing::info!(
            reason,
            network = requirement.map(|r| r.network.as_str()),
            max_amount_required = requirement.map(|r| r.max_amount_required.to_string()),
            "Search provider requires payment"
        );
    }
}

/// Log a successful search and its settlement confirmation.
pub fn log_success(body: &Bytes, payment_response: Option<&HeaderValue>) {
    let results = serde_json::from_slice::<SearchResponse>(body)
        .map(|response| response.data.web.len())
        .ok();

    let settlement = payment_response
        .and_then(|header| header.to_str().ok())
        .and_then(|raw| SettlementResponse::try_from(&Base64EncodedHeader(raw.to_string())).ok());

    match (payment_response, settlement) {
        (Some(_), Some(settlement)) => tracing::info!(
            results,
            success = settlement.success,
            transaction = %settlement.transaction,
            network = %settlement.network,
            payer = %redact_address(&settlement.payer),
            "Search paid and settled"
        ),
        (Some(_), None) => tracing::warn!(results, "Could not decode X-PAYMENT-RESPONSE"),
        (None, _) => tracing::info!(results, "Search succeeded without a payment confirmation"),
    }
}
