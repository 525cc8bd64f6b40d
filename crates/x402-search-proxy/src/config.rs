//! Proxy configuration, read from the environment.

use std::{
    fmt::Debug,
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use bon::Builder;
use url::Url;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.firecrawl.dev/v2/x402/search";

/// Long enough for the provider to verify a payment with its facilitator.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_NETWORK: &str = "base";

/// The search provider credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Remove every occurrence of the key from `text`.
    pub fn scrub(&self, text: &str) -> String {
        if self.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, "[REDACTED]")
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        ApiKey::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        ApiKey(key)
    }
}

#[derive(Builder, Debug, Clone)]
pub struct ProxyConfig {
    #[builder(default = SocketAddr::from(([0, 0, 0, 0], 3000)))]
    pub bind: SocketAddr,
    /// Search provider endpoint.
    pub upstream_url: Url,
    /// Search provider credential. Requests fail with a configuration error without it.
    #[builder(into)]
    pub api_key: Option<ApiKey>,
    /// Network payments are expected on, for diagnostics only.
    #[builder(into, default = DEFAULT_NETWORK.to_string())]
    pub expected_network: String,
    /// Asset contract payments are expected in, for diagnostics only.
    #[builder(into)]
    pub expected_asset: Option<String>,
    #[builder(default = DEFAULT_UPSTREAM_TIMEOUT)]
    pub upstream_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ProxyConfig {
    /// Read the configuration from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read the configuration from any variable source. Empty values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let host: IpAddr = match var(&["HOST"]) {
            Some(host) => host.parse().map_err(|err| ConfigError::Invalid {
                name: "HOST",
                reason: format!("{err}"),
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port: u16 = match var(&["PORT"]) {
            Some(port) => port.parse().map_err(|err| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{err}"),
            })?,
            None => 3000,
        };

        let upstream_url = var(&["SEARCH_API_BASE_URL", "FIRECRAWL_API_BASE_URL"])
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let upstream_url = Url::parse(&upstream_url).map_err(|err| ConfigError::Invalid {
            name: "SEARCH_API_BASE_URL",
            reason: format!("{err}"),
        })?;

        let upstream_timeout = match var(&["UPSTREAM_TIMEOUT_SECS"]) {
            Some(secs) => match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: "UPSTREAM_TIMEOUT_SECS",
                        reason: "must be at least 1".to_string(),
                    });
                }
                Err(err) => {
                    return Err(ConfigError::Invalid {
                        name: "UPSTREAM_TIMEOUT_SECS",
                        reason: format!("{err}"),
                    });
                }
            },
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        Ok(ProxyConfig {
            bind: SocketAddr::new(host, port),
            upstream_url,
            api_key: var(&["SEARCH_API_KEY", "FIRECRAWL_API_KEY"]).map(ApiKey::from),
            expected_network: var(&["X402_NETWORK", "NEXT_PUBLIC_NETWORK"])
                .unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            expected_asset: var(&["USDC_CONTRACT_ADDRESS"]),
            upstream_timeout,
        })
    }

    /// The usable credential, if one is configured.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(vars: &[(&str, &str)]) -> Result<ProxyConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProxyConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.bind, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert_eq!(config.upstream_url.as_str(), DEFAULT_UPSTREAM_URL);
        assert!(config.api_key().is_none());
        assert_eq!(config.expected_network, "base");
        assert_eq!(config.expected_asset, None);
        assert_eq!(config.upstream_timeout, DEFAULT_UPSTREAM_TIMEOUT);
    }

    #[test]
    fn reads_aliases_in_order() {
        let config = from_map(&[
            ("FIRECRAWL_API_KEY", "fc-legacy"),
            ("SEARCH_API_BASE_URL", "http://127.0.0.1:9000/search"),
            ("NEXT_PUBLIC_NETWORK", "base-sepolia"),
            ("PORT", "8080"),
            ("UPSTREAM_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(config.api_key().map(ApiKey::expose), Some("fc-legacy"));
        assert_eq!(config.upstream_url.as_str(), "http://127.0.0.1:9000/search");
        assert_eq!(config.expected_network, "base-sepolia");
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.upstream_timeout, Duration::from_secs(3));

        let config = from_map(&[
            ("SEARCH_API_KEY", "fc-new"),
            ("FIRECRAWL_API_KEY", "fc-legacy"),
        ])
        .unwrap();
        assert_eq!(config.api_key().map(ApiKey::expose), Some("fc-new"));
    }

    #[test]
    fn blank_key_is_missing() {
        let config = from_map(&[("SEARCH_API_KEY", "   ")]).unwrap();
        assert!(config.api_key().is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(from_map(&[("PORT", "http")]).is_err());
        assert!(from_map(&[("UPSTREAM_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_map(&[("SEARCH_API_BASE_URL", "not a url")]).is_err());
    }

    #[test]
    fn key_is_never_printed() {
        let key = ApiKey::new("fc-secret");
        assert_eq!(format!("{key:?}"), "ApiKey([REDACTED])");
        assert_eq!(
            key.scrub("Bearer fc-secret rejected"),
            "Bearer [REDACTED] rejected"
        );
    }
}
