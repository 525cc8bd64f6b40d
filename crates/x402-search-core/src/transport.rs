//! X402 v1 wire types exchanged between the client, the proxy and the search provider.
//!
//! - A `402` response carries a [`PaymentRequired`] body listing the accepted
//!   [`PaymentRequirements`].
//! - The paid retry carries a base64 [`PaymentPayload`] in the [`X_PAYMENT`] header.
//! - A paid success may carry a base64 [`SettlementResponse`] in [`X_PAYMENT_RESPONSE`].

use serde::{Deserialize, Serialize};

use crate::types::{AmountValue, AnyJson, Base64EncodedHeader, X402V1, X402Version};

/// Request header carrying the signed payment authorization.
pub const X_PAYMENT: &str = "x-payment";

/// Response header carrying the settlement confirmation.
pub const X_PAYMENT_RESPONSE: &str = "x-payment-response";

/// One payment option the provider accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Scheme name, e.g. `exact`
    pub scheme: String,
    /// Network name (`base`) or CAIP-2 id (`eip155:8453`)
    pub network: String,
    /// Maximum amount required for the payment in smallest units
    pub max_amount_required: AmountValue,
    /// Destination address to pay to
    pub pay_to: String,
    /// Asset contract address or symbol
    pub asset: String,
    /// Maximum timeout in seconds for the payment to be completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Scheme specific data, for `exact` on EVM the EIP-712 domain `name` and `version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<AnyJson>,
}

/// The body of a `402 Payment Required` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    pub x402_version: X402Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
}

/// The payment sent back to the provider, generic over the scheme payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload<P = AnyJson> {
    pub x402_version: X402V1,
    pub scheme: String,
    pub network: String,
    pub payload: P,
}

impl<P: Serialize> TryFrom<&PaymentPayload<P>> for Base64EncodedHeader {
    type Error = crate::errors::Error;

    fn try_from(value: &PaymentPayload<P>) -> Result<Self, Self::Error> {
        Base64EncodedHeader::encode(value)
    }
}

/// Settlement confirmation returned by the provider after a paid request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub payer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl TryFrom<&Base64EncodedHeader> for SettlementResponse {
    type Error = crate::errors::Error;

    fn try_from(value: &Base64EncodedHeader) -> Result<Self, Self::Error> {
        value.decode()
    }
}

/// A best-effort view of an `X-PAYMENT` header, for diagnostics only.
///
/// Nothing here is validated. Every field is optional and numeric fields accept either JSON
/// numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedPayment {
    #[serde(default)]
    pub x402_version: Option<AnyJson>,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub payload: Option<DecodedPaymentBody>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DecodedPaymentBody {
    #[serde(default)]
    pub authorization: Option<DecodedAuthorization>,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedAuthorization {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: Option<AnyJson>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub valid_after: Option<AnyJson>,
    #[serde(default)]
    pub valid_before: Option<AnyJson>,
}

impl DecodedPayment {
    /// Decode the raw header value. Fails only if it is not base64 JSON.
    pub fn decode(raw: &str) -> crate::errors::Result<Self> {
        Base64EncodedHeader(raw.to_string()).decode()
    }

    pub fn authorization(&self) -> Option<&DecodedAuthorization> {
        self.payload.as_ref()?.authorization.as_ref()
    }
}

impl DecodedAuthorization {
    pub fn value(&self) -> Option<AmountValue> {
        self.value.as_ref().and_then(json_u128).map(AmountValue)
    }

    pub fn valid_after(&self) -> Option<u64> {
        self.valid_after.as_ref().and_then(json_u128).map(|v| v as u64)
    }

    pub fn valid_before(&self) -> Option<u64> {
        self.valid_before.as_ref().and_then(json_u128).map(|v| v as u64)
    }
}

fn json_u128(value: &AnyJson) -> Option<u128> {
    match value {
        AnyJson::Number(n) => n.as_u64().map(u128::from),
        AnyJson::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
