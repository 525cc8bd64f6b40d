//! Payment schemes the client knows how to sign. Only `exact` on EVM networks is supported.

pub mod exact_evm;
pub mod exact_evm_signer;
