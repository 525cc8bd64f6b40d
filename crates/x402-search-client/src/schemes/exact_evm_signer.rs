use alloy_core::{
    sol,
    sol_types::{Eip712Domain, SolStruct, eip712_domain},
};
use alloy_primitives::{FixedBytes, U256};
use alloy_signer::{Error as AlloySignerError, Signer as AlloySigner};
use serde::Deserialize;
use x402_search_core::transport::PaymentPayload;

use crate::{
    networks::evm::{EvmAddress, EvmSignature},
    policy::{PaymentPolicy, PaymentSelection},
    schemes::exact_evm::*,
};

use std::time::SystemTime;

/// A wallet able to authorize token transfers.
///
/// Every [`alloy_signer::Signer`] is a wallet whose identity is its address. Wallets that can be
/// locked or disconnected report `None` from [`WalletSigner::current_signing_identity`].
pub trait WalletSigner {
    type Error: std::error::Error;

    /// The address that would sign right now, if any.
    fn current_signing_identity(&self) -> impl Future<Output = Option<EvmAddress>>;

    fn sign_authorization(
        &self,
        authorization: &Eip3009Authorization,
        asset_eip712_domain: &Eip712Domain,
    ) -> impl Future<Output = Result<EvmSignature, Self::Error>>;
}

sol!(
    /// Represent EIP-3009 Authorization struct
    ///
    /// For generating the EIP-712 signing hash
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

/// The EIP-712 typed form of an [`ExactEvmAuthorization`].
pub type Eip3009Authorization = TransferWithAuthorization;

impl From<&ExactEvmAuthorization> for Eip3009Authorization {
    fn from(authorization: &ExactEvmAuthorization) -> Self {
        Eip3009Authorization {
            from: authorization.from.0,
            to: authorization.to.0,
            value: U256::from(authorization.value.0),
            validAfter: U256::from(authorization.valid_after.0),
            validBefore: U256::from(authorization.valid_before.0),
            nonce: FixedBytes(authorization.nonce.0),
        }
    }
}

impl<S: AlloySigner> WalletSigner for S {
    type Error = AlloySignerError;

    async fn current_signing_identity(&self) -> Option<EvmAddress> {
        Some(EvmAddress(self.address()))
    }

    async fn sign_authorization(
        &self,
        authorization: &Eip3009Authorization,
        domain: &Eip712Domain,
    ) -> Result<EvmSignature, Self::Error> {
        let eip712_hash = authorization.eip712_signing_hash(domain);
        let signature = self.sign_hash(&eip712_hash).await?;

        Ok(EvmSignature(signature))
    }
}

/// The wallet of a session nobody has connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWallet;

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("No wallet connected")]
pub struct NoWalletError;

impl WalletSigner for NoWallet {
    type Error = NoWalletError;

    async fn current_signing_identity(&self) -> Option<EvmAddress> {
        None
    }

    async fn sign_authorization(
        &self,
        _authorization: &Eip3009Authorization,
        _domain: &Eip712Domain,
    ) -> Result<EvmSignature, Self::Error> {
        Err(NoWalletError)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExactEvmSignError<E> {
    #[error("Signer error: {0}")]
    SignerError(E),
    #[error("The token's EIP-712 domain is unknown")]
    MissingEip712Domain,
    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// Signs `exact` payments on the policy's network.
pub struct ExactEvmSigner<'a, S: WalletSigner> {
    pub signer: &'a S,
    pub policy: &'a PaymentPolicy,
}

impl<S: WalletSigner> ExactEvmSigner<'_, S> {
    /// Authorize `from` to pay the selected requirement and wrap the result in an x402 payment.
    pub async fn sign(
        &self,
        from: EvmAddress,
        selected: &PaymentSelection<'_>,
    ) -> Result<PaymentPayload<ExactEvmPayload>, ExactEvmSignError<S::Error>> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();

        #[derive(Deserialize)]
        struct Eip712DomainExtra {
            name: String,
            version: String,
        }

        let (name, version) = match selected
            .requirements
            .extra
            .as_ref()
            .and_then(|extra| serde_json::from_value::<Eip712DomainExtra>(extra.clone()).ok())
        {
            Some(extra) => (extra.name, extra.version),
            None => {
                let info = self
                    .policy
                    .eip712_domain
                    .ok_or(ExactEvmSignError::MissingEip712Domain)?;
                (info.name.to_string(), info.version.to_string())
            }
        };

        let authorization = ExactEvmAuthorization::new(
            from,
            selected.pay_to,
            selected.amount,
            selected.requirements.max_timeout_seconds,
            now,
        );

        let domain = eip712_domain!(
            name: name,
            version: version,
            chain_id: self.policy.network.chain_id,
            verifying_contract: selected.asset.0,
        );
        let signature = self
            .signer
            .sign_authorization(&(&authorization).into(), &domain)
            .await
            .map_err(ExactEvmSignError::SignerError)?;

        Ok(PaymentPayload {
            x402_version: Default::default(),
            scheme: SCHEME_NAME.to_string(),
            network: selected.requirements.network.clone(),
            payload: ExactEvmPayload {
                signature,
                authorization,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::signers::local::PrivateKeySigner;
    use serde_json::json;
    use x402_search_core::{transport::PaymentRequirements, types::AmountValue};

    use crate::networks::evm::{
        ExplicitEvmAsset, ExplicitEvmNetwork,
        assets::{UsdcBase, UsdcBaseSepolia},
        networks::{Base, BaseSepolia},
    };

    use super::*;

    fn requirements(extra: Option<serde_json::Value>) -> PaymentRequirements {
        serde_json::from_value(json!({
            "scheme": "exact",
            "network": "base-sepolia",
            "maxAmountRequired": "1000",
            "payTo": "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20",
            "asset": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            "maxTimeoutSeconds": 60,
            "extra": extra
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_signing() {
        let signer = PrivateKeySigner::random();
        let policy = PaymentPolicy::for_asset::<UsdcBaseSepolia>();
        let accepts = [requirements(Some(json!({ "name": "USD Coin", "version": "2" })))];
        let selected = policy.select(&accepts).unwrap();

        let payment = ExactEvmSigner {
            signer: &signer,
            policy: &policy,
        }
        .sign(EvmAddress(signer.address()), &selected)
        .await
        .expect("Signing should succeed");

        let authorization = &payment.payload.authorization;
        assert_eq!(authorization.value, AmountValue(1000));
        assert_eq!(authorization.from, EvmAddress(signer.address()));
        assert_eq!(authorization.to, selected.pay_to);
        assert_eq!(payment.network, "base-sepolia");

        let domain = eip712_domain! {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
            chain_id: BaseSepolia::NETWORK.chain_id,
            verifying_contract: UsdcBaseSepolia::ASSET.address.0,
        };

        let recovered_address = payment
            .payload
            .signature
            .0
            .recover_address_from_prehash(
                &Eip3009Authorization::from(authorization).eip712_signing_hash(&domain),
            )
            .expect("Recovery should succeed");

        assert_eq!(recovered_address, signer.address());
    }

    #[tokio::test]
    async fn falls_back_to_known_domain() {
        let signer = PrivateKeySigner::random();
        let policy = PaymentPolicy::for_asset::<UsdcBaseSepolia>();
        let accepts = [requirements(None)];
        let selected = policy.select(&accepts).unwrap();

        let payment = ExactEvmSigner {
            signer: &signer,
            policy: &policy,
        }
        .sign(EvmAddress(signer.address()), &selected)
        .await
        .unwrap();

        let domain = eip712_domain! {
            name: "USDC".to_string(),
            version: "2".to_string(),
            chain_id: BaseSepolia::NETWORK.chain_id,
            verifying_contract: UsdcBaseSepolia::ASSET.address.0,
        };
        let recovered_address = payment
            .payload
            .signature
            .0
            .recover_address_from_prehash(
                &Eip3009Authorization::from(&payment.payload.authorization)
                    .eip712_signing_hash(&domain),
            )
            .unwrap();
        assert_eq!(recovered_address, signer.address());
    }

    #[tokio::test]
    async fn unknown_domain_is_an_error() {
        let signer = PrivateKeySigner::random();
        let policy = PaymentPolicy::builder()
            .network(Base::NETWORK)
            .asset(UsdcBase::ASSET)
            .build();
        let mut requirement = requirements(None);
        requirement.network = "base".to_string();
        requirement.asset = "USDC".to_string();
        let accepts = [requirement];
        let selected = policy.select(&accepts).unwrap();

        let result = ExactEvmSigner {
            signer: &signer,
            policy: &policy,
        }
        .sign(EvmAddress(signer.address()), &selected)
        .await;
        assert!(matches!(
            result,
            Err(ExactEvmSignError::MissingEip712Domain)
        ));
    }

    #[tokio::test]
    async fn no_wallet_has_no_identity() {
        assert_eq!(NoWallet.current_signing_identity().await, None);
    }
}
