//! Payment-aware search client.
//!
//! [`client::SearchClient`] sends a search to the pay-per-search proxy. When the provider answers
//! `402 Payment Required`, the request is paid for with an EIP-3009 authorization signed by the
//! caller's [`WalletSigner`](schemes::exact_evm_signer::WalletSigner) and sent once more.
//!
//! - [`transport`]: the one-method [`Transport`](transport::Transport) trait and a reqwest
//!   implementation.
//! - [`payment_transport`]: the decorator answering `402` challenges.
//! - [`policy`]: which network, asset and price the client accepts.
//! - [`networks`] and [`schemes`]: EVM networks, USDC contracts and `exact` payment signing.
//! - [`errors`]: the closed set of failures returned to the caller.

pub mod client;
pub mod errors;
pub mod networks;
pub mod payment_transport;
pub mod policy;
pub mod schemes;
pub mod transport;

pub use x402_search_core as search_core;
