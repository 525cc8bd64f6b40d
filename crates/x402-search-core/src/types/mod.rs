//! Value types used across the search client and proxy.

mod amount;
mod common;

pub use amount::*;
pub use common::*;
