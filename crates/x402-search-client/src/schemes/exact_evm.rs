use serde::{Deserialize, Serialize};
use x402_search_core::types::AmountValue;

use crate::networks::evm::{EvmAddress, EvmSignature};

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

/// Scheme name of a fixed-amount transfer.
pub const SCHEME_NAME: &str = "exact";

/// How far back `validAfter` is set, to tolerate clock skew between the wallet and the chain.
pub const VALID_AFTER_SKEW_SECS: u64 = 60;

/// Validity window used when the provider does not state one.
pub const DEFAULT_VALIDITY_SECS: u64 = 60;

/// Upper bound on the validity window, whatever the provider asks for.
pub const MAX_VALIDITY_SECS: u64 = 300;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce(pub [u8; 32]);

impl Nonce {
    pub fn random() -> Self {
        Nonce(rand::random())
    }
}

impl Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

impl Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Nonce {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Nonce(arr))
    }
}

impl Serialize for Nonce {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let nonce = Nonce::from_str(&s).map_err(serde::de::Error::custom)?;
        Ok(nonce)
    }
}

/// Unix time in seconds, carried as a decimal string on the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampSeconds(pub u64);

impl Display for TimestampSeconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for TimestampSeconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimestampSeconds({})", self.0)
    }
}

impl Serialize for TimestampSeconds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimestampSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let seconds = s.parse::<u64>().map_err(serde::de::Error::custom)?;
        Ok(TimestampSeconds(seconds))
    }
}

/// The `payload` object of an `exact` EVM payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayload {
    pub signature: EvmSignature,
    pub authorization: ExactEvmAuthorization,
}

/// An EIP-3009 `transferWithAuthorization` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    pub from: EvmAddress,
    pub to: EvmAddress,
    pub value: AmountValue,
    pub valid_after: TimestampSeconds,
    pub valid_before: TimestampSeconds,
    pub nonce: Nonce,
}

impl ExactEvmAuthorization {
    /// Authorize `from` to pay `value` to `to`, valid from a minute ago until
    /// `max_timeout_seconds` from now (capped at [`MAX_VALIDITY_SECS`]), with a fresh nonce.
    pub fn new(
        from: EvmAddress,
        to: EvmAddress,
        value: AmountValue,
        max_timeout_seconds: Option<u64>,
        now: u64,
    ) -> Self {
        let validity = max_timeout_seconds
            .unwrap_or(DEFAULT_VALIDITY_SECS)
            .min(MAX_VALIDITY_SECS);

        ExactEvmAuthorization {
            from,
            to,
            value,
            valid_after: TimestampSeconds(now.saturating_sub(VALID_AFTER_SKEW_SECS)),
            valid_before: TimestampSeconds(now + validity),
            nonce: Nonce::random(),
        }
    }
}
