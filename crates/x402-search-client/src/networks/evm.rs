use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// An EVM chain the search provider may ask to be paid on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmNetwork {
    /// The x402 network name, e.g. `base`.
    pub name: &'static str,
    pub chain_id: u64,
    /// CAIP-2 identifier, e.g. `eip155:8453`.
    pub network_id: &'static str,
    /// Block explorer base URL, used to link settled transactions.
    pub explorer: &'static str,
}

impl EvmNetwork {
    /// Whether a network string from a payment challenge designates this network.
    ///
    /// Providers use either the x402 name or the CAIP-2 id.
    pub fn matches(&self, network: &str) -> bool {
        network.eq_ignore_ascii_case(self.name) || network.eq_ignore_ascii_case(self.network_id)
    }

    /// Link to a transaction on the block explorer.
    pub fn transaction_url(&self, transaction: &str) -> String {
        format!("{}/tx/{}", self.explorer.trim_end_matches('/'), transaction)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress(pub alloy_primitives::Address);

impl EvmAddress {
    /// Shortened form for logs, e.g. `0x3CB9…dE20`.
    pub fn redacted(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl From<alloy_primitives::Address> for EvmAddress {
    fn from(addr: alloy_primitives::Address) -> Self {
        EvmAddress(addr)
    }
}

impl FromStr for EvmAddress {
    type Err = alloy_primitives::AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = alloy_primitives::Address::from_str(s)?;
        Ok(EvmAddress(addr))
    }
}

impl Display for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EvmAddress({})", self.0)
    }
}

impl Serialize for EvmAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EvmAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EvmAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmSignature(pub alloy_primitives::Signature);

impl Display for EvmSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl Debug for EvmSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EvmSignature(..)")
    }
}

impl FromStr for EvmSignature {
    type Err = alloy_primitives::SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sig = alloy_primitives::Signature::from_str(s)?;
        Ok(EvmSignature(sig))
    }
}

impl Serialize for EvmSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EvmSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EvmSignature::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<alloy_primitives::Signature> for EvmSignature {
    fn from(sig: alloy_primitives::Signature) -> Self {
        EvmSignature(sig)
    }
}

/// EIP-712 domain fields of a token contract that are not derivable from the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eip712DomainInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// A token on an EVM network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmAsset {
    pub address: EvmAddress,
    pub decimals: u8,
    pub name: &'static str,
    pub symbol: &'static str,
}

impl EvmAsset {
    /// Whether an asset string from a payment challenge designates this asset.
    ///
    /// Contract addresses are compared case-insensitively; a bare symbol is also accepted.
    pub fn matches(&self, asset: &str) -> bool {
        match asset.parse::<EvmAddress>() {
            Ok(address) => address == self.address,
            Err(_) => asset.eq_ignore_ascii_case(self.symbol),
        }
    }
}

impl EvmNetwork {
    /// Look up a known network by x402 name or CAIP-2 id.
    pub fn by_name(network: &str) -> Option<EvmNetwork> {
        use networks::*;

        [
            Ethereum::NETWORK,
            EthereumSepolia::NETWORK,
            Base::NETWORK,
            BaseSepolia::NETWORK,
        ]
        .into_iter()
        .find(|known| known.matches(network))
    }
}

pub trait ExplicitEvmNetwork {
    const NETWORK: EvmNetwork;
}

pub trait ExplicitEvmAsset {
    type Network: ExplicitEvmNetwork;

    const ASSET: EvmAsset;
    const EIP712_DOMAIN: Option<Eip712DomainInfo>;
}

pub mod networks {
    use super::*;

    macro_rules! define_explicit_evm_network {
        ($struct_name:ident, $network_const:expr) => {
            #[derive(Debug, Clone, Copy)]
            pub struct $struct_name;

            impl ExplicitEvmNetwork for $struct_name {
                const NETWORK: EvmNetwork = $network_const;
            }
        };
    }

    define_explicit_evm_network!(
        Ethereum,
        EvmNetwork {
            name: "ethereum",
            chain_id: 1,
            network_id: "eip155:1",
            explorer: "https://etherscan.io",
        }
    );
    define_explicit_evm_network!(
        EthereumSepolia,
        EvmNetwork {
            name: "ethereum-sepolia",
            chain_id: 11155111,
            network_id: "eip155:11155111",
            explorer: "https://sepolia.etherscan.io",
        }
    );
    define_explicit_evm_network!(
        Base,
        EvmNetwork {
            name: "base",
            chain_id: 8453,
            network_id: "eip155:8453",
            explorer: "https://basescan.org",
        }
    );
    define_explicit_evm_network!(
        BaseSepolia,
        EvmNetwork {
            name: "base-sepolia",
            chain_id: 84532,
            network_id: "eip155:84532",
            explorer: "https://sepolia.basescan.org",
        }
    );
}

pub mod assets {
    use alloy_primitives::address;

    use super::*;

    macro_rules! define_explicit_evm_asset {
        (
            $struct_name:ident,
            $network_struct:ty,
            $addr:expr,
            $decimals:expr,
            $name:expr,
            $symbol:expr,
            $eip712_domain:expr
        ) => {
            #[derive(Debug, Clone, Copy)]
            pub struct $struct_name;

            impl ExplicitEvmAsset for $struct_name {
                type Network = $network_struct;

                const ASSET: EvmAsset = EvmAsset {
                    address: EvmAddress(address!($addr)),
                    decimals: $decimals,
                    name: $name,
                    symbol: $symbol,
                };

                const EIP712_DOMAIN: Option<Eip712DomainInfo> = $eip712_domain;
            }
        };
    }

    macro_rules! define_explicit_usdc {
        ($struct_name:ident, $network_struct:ty, $addr:expr, $domain_name:expr) => {
            define_explicit_evm_asset!(
                $struct_name,
                $network_struct,
                $addr,
                6,
                "USD Coin",
                "USDC",
                Some(Eip712DomainInfo {
                    name: $domain_name,
                    version: "2",
                })
            );
        };
    }

    define_explicit_usdc!(
        UsdcEthereum,
        networks::Ethereum,
        "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        "USD Coin"
    );

    define_explicit_usdc!(
        UsdcEthereumSepolia,
        networks::EthereumSepolia,
        "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
        "USDC"
    );

    define_explicit_usdc!(
        UsdcBase,
        networks::Base,
        "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        "USD Coin"
    );

    define_explicit_usdc!(
        UsdcBaseSepolia,
        networks::BaseSepolia,
        "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
        "USDC"
    );
}
