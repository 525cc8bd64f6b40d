//! Networks a payment can be made on, and the tokens used to pay.

pub mod evm;
