//! Unified types shared by the vault, the strategy and market collaborators

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use super::errors::{Result, StraddleError};

/// Decimals of the fixed-point contract amount (1e18 units = one contract)
pub const CONTRACT_DECIMALS: u32 = 18;

/// Decimals kept on quote/base asset amounts
pub const ASSET_DECIMALS: u32 = 18;

/// 20-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Build an address from raw bytes
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address whose low eight bytes hold `value` (big endian)
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = StraddleError;

    fn from_str(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| StraddleError::InvalidArgument(format!("invalid address '{}': {}", s, e)))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| {
            StraddleError::InvalidArgument(format!("address '{}' must be 20 bytes", s))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Fungible assets held on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    /// Funding asset (USD stablecoin)
    Quote,
    /// Underlying asset
    Base,
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Quote => write!(f, "quote"),
            Asset::Base => write!(f, "base"),
        }
    }
}

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier of an options board (one expiry)
    BoardId
);
id_newtype!(
    /// Identifier of a listed strike
    StrikeId
);
id_newtype!(
    /// Identifier of a position token minted by the market
    PositionId
);

/// Option type of a market position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionType {
    LongCall,
    LongPut,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::LongCall => write!(f, "LONG_CALL"),
            OptionType::LongPut => write!(f, "LONG_PUT"),
        }
    }
}

/// One side of a straddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Call,
    Put,
}

impl Leg {
    pub fn option_type(&self) -> OptionType {
        match self {
            Leg::Call => OptionType::LongCall,
            Leg::Put => OptionType::LongPut,
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Call => write!(f, "call"),
            Leg::Put => write!(f, "put"),
        }
    }
}

/// A tradable option series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strike {
    pub id: StrikeId,
    pub board_id: BoardId,
    /// Strike price in quote asset units
    pub strike_price: Decimal,
    /// Volatility skew applied to the board's base IV
    pub skew: Decimal,
    /// Board expiry
    pub expiry: DateTime<Utc>,
}

/// Price of opening a single leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegQuote {
    pub option_type: OptionType,
    /// Option premium for the whole amount
    pub premium: Decimal,
    /// Market fee for the whole amount
    pub fee: Decimal,
    /// premium + fee, the collateral debited on open
    pub total_cost: Decimal,
}

/// Inputs for opening a position
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPositionParams {
    pub strike_id: StrikeId,
    /// Fixed-point contract amount
    pub amount: u128,
    pub option_type: OptionType,
    /// Reject the trade if the total cost exceeds this bound
    pub max_total_cost: Decimal,
}

/// Outcome of an open or close on the market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub position_id: PositionId,
    /// Collateral debited (open) or proceeds credited (close)
    pub total_cost: Decimal,
    pub total_fee: Decimal,
}

/// Lifecycle of a market position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    Active,
    Closed,
}

/// Position token as tracked by the market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPosition {
    pub id: PositionId,
    pub strike_id: StrikeId,
    pub option_type: OptionType,
    pub amount: u128,
    pub owner: Address,
    pub state: PositionState,
}

/// Convert a fixed-point contract amount into whole contracts
pub fn contracts_from_units(amount: u128) -> Result<Decimal> {
    let raw = i128::try_from(amount)
        .map_err(|_| StraddleError::InvalidArgument(format!("amount {} is too large", amount)))?;
    Decimal::try_from_i128_with_scale(raw, CONTRACT_DECIMALS)
        .map_err(|e| StraddleError::InvalidArgument(format!("amount {}: {}", amount, e)))
}

/// Round a cost the payer owes, never in the payer's favour
pub fn round_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ASSET_DECIMALS, RoundingStrategy::AwayFromZero)
}

/// Round proceeds owed to a holder, never in the holder's favour
pub fn round_proceeds(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ASSET_DECIMALS, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_address_roundtrip_display() {
        let addr = Address::from_low_u64(0x1001);
        let text = addr.to_string();
        assert_eq!(text, "0x0000000000000000000000000000000000001001");
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_contracts_from_units() {
        assert_eq!(contracts_from_units(1_000_000_000_000_000_000).unwrap(), dec!(1));
        assert_eq!(contracts_from_units(100_000).unwrap(), dec!(0.0000000000001));
        assert!(contracts_from_units(u128::MAX).is_err());
    }

    #[test]
    fn test_rounding_direction() {
        let value = dec!(1.0000000000000000001);
        assert_eq!(round_cost(value), dec!(1.000000000000000001));
        assert_eq!(round_proceeds(value), dec!(1));
    }
}
