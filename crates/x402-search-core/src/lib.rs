//! Shared data model for x402 pay-per-search.
//!
//! Both the payment-aware client and the proxy endpoint speak in these types:
//!
//! - [`search`]: the search request sent by the client, its normalized upstream form, and the
//!   provider's search response.
//! - [`envelope`]: the uniform error envelope and the closed set of [`envelope::ErrorKind`]s.
//! - [`transport`]: x402 v1 wire types carried in the `402` body and in the `X-PAYMENT` /
//!   `X-PAYMENT-RESPONSE` headers.
//! - [`types`]: small re-usable value types such as [`types::AmountValue`].

pub mod envelope;
pub mod errors;
pub mod search;
pub mod transport;
pub mod types;
