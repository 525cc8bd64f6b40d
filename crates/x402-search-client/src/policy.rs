//! Which payment challenges the client is willing to answer.

use bon::Builder;
use x402_search_core::{transport::PaymentRequirements, types::AmountValue};

use crate::{
    networks::evm::{
        Eip712DomainInfo, EvmAddress, EvmAsset, EvmNetwork, ExplicitEvmAsset, ExplicitEvmNetwork,
        assets::UsdcBase,
    },
    schemes::exact_evm::SCHEME_NAME,
};

/// Highest price paid for a single request unless configured otherwise: 0.10 USDC.
pub const DEFAULT_MAX_AMOUNT: AmountValue = AmountValue(100_000);

/// The network, asset and price ceiling the client pays with.
///
/// ```
/// use x402_search_client::policy::PaymentPolicy;
/// use x402_search_client::networks::evm::{ExplicitEvmAsset, assets::UsdcBaseSepolia};
///
/// let policy = PaymentPolicy::for_asset::<UsdcBaseSepolia>()
///     .with_max_amount(50_000u64);
///
/// assert_eq!(policy.network.name, "base-sepolia");
/// assert_eq!(policy.asset, UsdcBaseSepolia::ASSET);
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct PaymentPolicy {
    pub network: EvmNetwork,
    pub asset: EvmAsset,
    /// Token domain used when the challenge does not carry one in `extra`.
    pub eip712_domain: Option<Eip712DomainInfo>,
    #[builder(into, default = DEFAULT_MAX_AMOUNT)]
    pub max_amount: AmountValue,
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self::for_asset::<UsdcBase>()
    }
}

/// The requirement chosen to be paid, with addresses parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSelection<'a> {
    pub requirements: &'a PaymentRequirements,
    pub pay_to: EvmAddress,
    pub asset: EvmAddress,
    pub amount: AmountValue,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("No acceptable payment option (offered: {offered})")]
    NoAcceptablePayment { offered: String },
    #[error("Price {required} exceeds the maximum of {max}")]
    AmountExceedsMax {
        required: AmountValue,
        max: AmountValue,
    },
}

impl PaymentPolicy {
    /// Pay with a known token on its own network, up to [`DEFAULT_MAX_AMOUNT`].
    pub fn for_asset<A: ExplicitEvmAsset>() -> Self {
        PaymentPolicy {
            network: A::Network::NETWORK,
            asset: A::ASSET,
            eip712_domain: A::EIP712_DOMAIN,
            max_amount: DEFAULT_MAX_AMOUNT,
        }
    }

    pub fn with_max_amount(mut self, max_amount: impl Into<AmountValue>) -> Self {
        self.max_amount = max_amount.into();
        self
    }

    /// Whether a single requirement is payable under this policy, ignoring price.
    pub fn accepts(&self, requirements: &PaymentRequirements) -> bool {
        requirements.scheme == SCHEME_NAME
            && self.network.matches(&requirements.network)
            && self.asset.matches(&requirements.asset)
            && requirements.pay_to.parse::<EvmAddress>().is_ok()
    }

    /// Pick the cheapest acceptable requirement within the price ceiling.
    pub fn select<'a>(
        &self,
        accepts: &'a [PaymentRequirements],
    ) -> Result<PaymentSelection<'a>, SelectionError> {
        let mut candidates: Vec<&PaymentRequirements> =
            accepts.iter().filter(|pr| self.accepts(pr)).collect();

        if candidates.is_empty() {
            let offered = accepts
                .iter()
                .map(|pr| format!("{}/{}/{}", pr.scheme, pr.network, pr.asset))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SelectionError::NoAcceptablePayment {
                offered: if offered.is_empty() {
                    "none".to_string()
                } else {
                    offered
                },
            });
        }

        candidates.sort_by_key(|pr| pr.max_amount_required);
        let cheapest = candidates[0];
        if cheapest.max_amount_required > self.max_amount {
            return Err(SelectionError::AmountExceedsMax {
                required: cheapest.max_amount_required,
                max: self.max_amount,
            });
        }

        let pay_to = cheapest.pay_to.parse().map_err(|_| SelectionError::NoAcceptablePayment {
            offered: cheapest.pay_to.clone(),
        })?;
        // A symbol match means the challenge did not name the contract; pay the configured one.
        let asset = cheapest.asset.parse().unwrap_or(self.asset.address);

        Ok(PaymentSelection {
            requirements: cheapest,
            pay_to,
            asset,
            amount: cheapest.max_amount_required,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::networks::evm::assets::UsdcBaseSepolia;

    fn requirement(network: &str, asset: &str, amount: u64) -> PaymentRequirements {
        serde_json::from_value(json!({
            "scheme": "exact",
            "network": network,
            "maxAmountRequired": amount.to_string(),
            "payTo": "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20",
            "asset": asset,
            "maxTimeoutSeconds": 60
        }))
        .unwrap()
    }

    const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    #[test]
    fn selects_matching_requirement() {
        let policy = PaymentPolicy::default();
        let accepts = vec![
            requirement("base-sepolia", "0x036CbD53842c5426634e7929541eC2318f3dCF7e", 1),
            requirement("eip155:8453", USDC_BASE, 10_000),
        ];

        let selection = policy.select(&accepts).unwrap();
        assert_eq!(selection.amount, AmountValue(10_000));
        assert_eq!(selection.asset, UsdcBase::ASSET.address);
    }

    #[test]
    fn prefers_cheapest_option() {
        let policy = PaymentPolicy::default();
        let accepts = vec![
            requirement("base", USDC_BASE, 50_000),
            requirement("base", "USDC", 20_000),
        ];

        let selection = policy.select(&accepts).unwrap();
        assert_eq!(selection.amount, AmountValue(20_000));
        assert_eq!(selection.asset, UsdcBase::ASSET.address);
    }

    #[test]
    fn refuses_overpriced_challenge() {
        let policy = PaymentPolicy::default();
        let accepts = vec![requirement("base", USDC_BASE, 100_001)];

        assert_eq!(
            policy.select(&accepts),
            Err(SelectionError::AmountExceedsMax {
                required: AmountValue(100_001),
                max: DEFAULT_MAX_AMOUNT,
            })
        );

        let exact_max = vec![requirement("base", USDC_BASE, 100_000)];
        assert!(policy.select(&exact_max).is_ok());
    }

    #[test]
    fn refuses_other_networks_and_schemes() {
        let policy = PaymentPolicy::for_asset::<UsdcBaseSepolia>();
        let mut upto = requirement("base-sepolia", "USDC", 1);
        upto.scheme = "upto".to_string();

        let err = policy
            .select(&[requirement("base", USDC_BASE, 1), upto])
            .unwrap_err();
        assert!(matches!(err, SelectionError::NoAcceptablePayment { .. }));

        assert_eq!(
            policy.select(&[]),
            Err(SelectionError::NoAcceptablePayment {
                offered: "none".to_string()
            })
        );
    }
}
