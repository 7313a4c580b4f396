//! Collateral vault
//!
//! Holds quote/base balances and delegates straddle execution to a single
//! active strategy. Only the vault owner can trigger fund-bearing calls.

mod collateral;

pub use collateral::{CollateralVault, VaultBalances};
