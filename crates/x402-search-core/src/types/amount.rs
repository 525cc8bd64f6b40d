//! [`AmountValue`] represents an asset amount in minor units.
//!
//! Amounts travel as decimal strings on the wire to avoid floating point.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// An amount of an asset, in its smallest indivisible unit.
///
/// `AmountValue(100_000)` of a 6-decimals asset such as USDC is `0.1` USDC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountValue(pub u128);

impl AmountValue {
    /// Render the amount in whole asset units with `decimals` fractional digits.
    ///
    /// ```
    /// use x402_search_core::types::AmountValue;
    ///
    /// assert_eq!(AmountValue(100_000).to_units(6), "0.100000");
    /// assert_eq!(AmountValue(12_500_000).to_units(6), "12.500000");
    /// assert_eq!(AmountValue(42).to_units(0), "42");
    /// ```
    pub fn to_units(&self, decimals: u8) -> String {
        if decimals == 0 {
            return self.0.to_string();
        }
        let scale = 10u128.pow(decimals as u32);
        format!(
            "{}.{:0width$}",
            self.0 / scale,
            self.0 % scale,
            width = decimals as usize
        )
    }
}

impl From<u32> for AmountValue {
    fn from(value: u32) -> Self {
        AmountValue(value as u128)
    }
}

impl From<u64> for AmountValue {
    fn from(value: u64) -> Self {
        AmountValue(value as u128)
    }
}

impl From<u128> for AmountValue {
    fn from(value: u128) -> Self {
        AmountValue(value)
    }
}

impl FromStr for AmountValue {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u128>().map(AmountValue)
    }
}

impl Display for AmountValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AmountValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AmountValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Providers are not consistent about quoting amounts.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(AmountValue::from(n)),
        }
    }
}
