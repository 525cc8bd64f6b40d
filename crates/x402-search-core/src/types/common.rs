//! Miscellaneous common types used throughout the codebase.

use std::fmt::{Debug, Display};

use base64::{Engine, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Represents a key-value bag. The key is a `String`.
pub type Record<V> = std::collections::HashMap<String, V>;

/// Represents any JSON value. Used for provider-defined payloads passed through untouched.
pub type AnyJson = serde_json::Value;

/// Represents the X402 protocol version 1, the only version the search provider speaks.
///
/// ```
/// use serde::{Serialize, Deserialize};
/// use x402_search_core::types::X402V1;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct ExampleV1 {
///     x402_version: X402V1,
/// }
///
/// let example: ExampleV1 = serde_json::from_value(serde_json::json!({
///     "x402Version": 1,
/// })).unwrap();
///
/// assert_eq!(example.x402_version, X402V1);
/// assert!(serde_json::from_value::<ExampleV1>(serde_json::json!({ "x402Version": 2 })).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct X402V1;

impl Serialize for X402V1 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i8(1)
    }
}

impl<'de> Deserialize<'de> for X402V1 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = i8::deserialize(deserializer)?;
        match v {
            1 => Ok(X402V1),
            _ => Err(serde::de::Error::custom(format!(
                "Unsupported X402 version {}; expected 1",
                v
            ))),
        }
    }
}

impl Display for X402V1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1")
    }
}

/// Represents whatever protocol version a peer announced.
///
/// Used where the version is only reported, never enforced, e.g. in 402 challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum X402Version {
    V1,
    Other(i64),
}

impl X402Version {
    pub fn is_v1(&self) -> bool {
        matches!(self, X402Version::V1)
    }
}

impl Serialize for X402Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            X402Version::V1 => serializer.serialize_i64(1),
            X402Version::Other(v) => serializer.serialize_i64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for X402Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match i64::deserialize(deserializer)? {
            1 => Ok(X402Version::V1),
            v => Ok(X402Version::Other(v)),
        }
    }
}

impl Display for X402Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            X402Version::V1 => write!(f, "1"),
            X402Version::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Represents a base64-encoded JSON header value, e.g. `X-PAYMENT` or `X-PAYMENT-RESPONSE`.
///
/// ```
/// use x402_search_core::types::Base64EncodedHeader;
///
/// let header = Base64EncodedHeader::encode(&serde_json::json!({ "transaction": "0xabc" })).unwrap();
/// let decoded: serde_json::Value = header.decode().unwrap();
/// assert_eq!(decoded["transaction"], "0xabc");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Base64EncodedHeader(pub String);

impl Base64EncodedHeader {
    /// Serialize `value` as JSON and base64-encode it.
    pub fn encode<T: Serialize>(value: &T) -> crate::errors::Result<Self> {
        let json = serde_json::to_string(value)?;
        Ok(Base64EncodedHeader(BASE64_STANDARD.encode(json)))
    }

    /// Base64-decode the header and parse it as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> crate::errors::Result<T> {
        let decoded_bytes = BASE64_STANDARD.decode(self.0.trim())?;
        let json_str = String::from_utf8(decoded_bytes)?;
        Ok(serde_json::from_str(&json_str)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Header values are bearer-like; keep them out of debug output.
impl Debug for Base64EncodedHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Base64EncodedHeader(<{} bytes>)", self.0.len())
    }
}

impl Display for Base64EncodedHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Base64EncodedHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Base64EncodedHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Base64EncodedHeader(s))
    }
}
