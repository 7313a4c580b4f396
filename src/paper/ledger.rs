//! In-memory asset ledger

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::common::errors::{Result, StraddleError};
use crate::common::traits::AssetLedger;
use crate::common::types::{Address, Asset};

/// Balances and allowances for one asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetBook {
    pub balances: HashMap<Address, Decimal>,
    /// owner -> spender -> remaining allowance
    pub allowances: HashMap<Address, HashMap<Address, Decimal>>,
}

impl AssetBook {
    fn balance(&self, owner: &Address) -> Decimal {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Decimal {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or_default()
    }

    fn move_funds(&mut self, from: &Address, to: &Address, amount: Decimal) -> Result<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(StraddleError::InsufficientCollateral {
                required: amount,
                available,
            });
        }
        self.balances.insert(*from, available - amount);
        *self.balances.entry(*to).or_default() += amount;
        Ok(())
    }
}

/// Serializable ledger state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub quote: AssetBook,
    pub base: AssetBook,
}

impl LedgerSnapshot {
    fn book(&self, asset: Asset) -> &AssetBook {
        match asset {
            Asset::Quote => &self.quote,
            Asset::Base => &self.base,
        }
    }

    fn book_mut(&mut self, asset: Asset) -> &mut AssetBook {
        match asset {
            Asset::Quote => &mut self.quote,
            Asset::Base => &mut self.base,
        }
    }
}

/// Quote/base balances with approve/transferFrom custody
#[derive(Default)]
pub struct PaperLedger {
    state: RwLock<LedgerSnapshot>,
}

impl PaperLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit newly issued funds to `to`
    pub async fn mint(&self, asset: Asset, to: &Address, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let mut state = self.state.write().await;
        *state.book_mut(asset).balances.entry(*to).or_default() += amount;
        debug!(%asset, %to, %amount, "Minted");
        Ok(())
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().await.clone()
    }

    pub async fn restore(&self, snapshot: LedgerSnapshot) {
        *self.state.write().await = snapshot;
    }
}

fn ensure_non_negative(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(StraddleError::InvalidArgument(format!(
            "amount {} must not be negative",
            amount
        )));
    }
    Ok(())
}

#[async_trait]
impl AssetLedger for PaperLedger {
    async fn balance_of(&self, asset: Asset, owner: &Address) -> Result<Decimal> {
        Ok(self.state.read().await.book(asset).balance(owner))
    }

    async fn allowance(&self, asset: Asset, owner: &Address, spender: &Address) -> Result<Decimal> {
        Ok(self.state.read().await.book(asset).allowance(owner, spender))
    }

    async fn approve(&self, caller: &Address, asset: Asset, spender: &Address, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let mut state = self.state.write().await;
        state
            .book_mut(asset)
            .allowances
            .entry(*caller)
            .or_default()
            .insert(*spender, amount);
        debug!(%asset, owner = %caller, %spender, %amount, "Approved");
        Ok(())
    }

    async fn transfer(&self, caller: &Address, asset: Asset, to: &Address, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let mut state = self.state.write().await;
        state.book_mut(asset).move_funds(caller, to, amount)?;
        debug!(%asset, from = %caller, %to, %amount, "Transferred");
        Ok(())
    }

    async fn transfer_from(
        &self,
        caller: &Address,
        asset: Asset,
        from: &Address,
        to: &Address,
        amount: Decimal,
    ) -> Result<()> {
        ensure_non_negative(amount)?;
        let mut state = self.state.write().await;
        let book = state.book_mut(asset);

        let allowed = book.allowance(from, caller);
        if allowed < amount {
            return Err(StraddleError::InsufficientCollateral {
                required: amount,
                available: allowed,
            });
        }

        book.move_funds(from, to, amount)?;
        book.allowances
            .entry(*from)
            .or_default()
            .insert(*caller, allowed - amount);
        debug!(%asset, %from, %to, spender = %caller, %amount, "Transferred from");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn alice() -> Address {
        Address::from_low_u64(0xA)
    }

    fn bob() -> Address {
        Address::from_low_u64(0xB)
    }

    #[tokio::test]
    async fn test_transfer_from_consumes_allowance() {
        let ledger = PaperLedger::new();
        ledger.mint(Asset::Quote, &alice(), dec!(100)).await.unwrap();
        ledger.approve(&alice(), Asset::Quote, &bob(), dec!(60)).await.unwrap();

        ledger
            .transfer_from(&bob(), Asset::Quote, &alice(), &bob(), dec!(40))
            .await
            .unwrap();

        assert_eq!(ledger.balance_of(Asset::Quote, &alice()).await.unwrap(), dec!(60));
        assert_eq!(ledger.balance_of(Asset::Quote, &bob()).await.unwrap(), dec!(40));
        assert_eq!(
            ledger.allowance(Asset::Quote, &alice(), &bob()).await.unwrap(),
            dec!(20)
        );
    }

    #[tokio::test]
    async fn test_transfer_from_beyond_allowance_fails() {
        let ledger = PaperLedger::new();
        ledger.mint(Asset::Quote, &alice(), dec!(100)).await.unwrap();
        ledger.approve(&alice(), Asset::Quote, &bob(), dec!(10)).await.unwrap();

        let err = ledger
            .transfer_from(&bob(), Asset::Quote, &alice(), &bob(), dec!(11))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StraddleError::InsufficientCollateral { available, .. } if available == dec!(10)
        ));
        assert_eq!(ledger.balance_of(Asset::Quote, &alice()).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn test_assets_are_separate() {
        let ledger = PaperLedger::new();
        ledger.mint(Asset::Base, &alice(), dec!(3)).await.unwrap();

        assert_eq!(ledger.balance_of(Asset::Quote, &alice()).await.unwrap(), dec!(0));
        let err = ledger
            .transfer(&alice(), Asset::Quote, &bob(), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::InsufficientCollateral { .. }));
    }
}
