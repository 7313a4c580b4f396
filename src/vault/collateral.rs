use futures_util::future::try_join;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument};

use crate::common::errors::{Result, StraddleError};
use crate::common::traits::AssetLedger;
use crate::common::types::{Address, Asset, StrikeId};
use crate::strategy::{CollateralSizer, SharedStrategy, StraddlePosition, StraddleQuote};

/// Quote and base holdings of a vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultBalances {
    pub address: Address,
    pub quote: Decimal,
    pub base: Decimal,
}

/// Fund custody and the only entry point for opening a straddle
pub struct CollateralVault {
    address: Address,
    owner: Address,
    ledger: Arc<dyn AssetLedger>,
    strategy: RwLock<Option<SharedStrategy>>,
    /// Serializes fund-bearing calls so approvals never overlap
    purchase_lock: Mutex<()>,
}

impl CollateralVault {
    pub fn new(address: Address, owner: Address, ledger: Arc<dyn AssetLedger>) -> Self {
        Self {
            address,
            owner,
            ledger,
            strategy: RwLock::new(None),
            purchase_lock: Mutex::new(()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(StraddleError::NotAuthorized(format!(
                "{} is not the owner of vault {}",
                caller, self.address
            )));
        }
        Ok(())
    }

    async fn active_strategy(&self) -> Result<SharedStrategy> {
        self.strategy.read().await.clone().ok_or_else(|| {
            StraddleError::NotInitialized(format!("vault {} has no strategy", self.address))
        })
    }

    /// Replace the active strategy
    ///
    /// Rejected while the current strategy still holds an open round, so no
    /// leg positions are stranded behind a strategy the vault can no longer reach.
    #[instrument(skip(self, strategy), fields(vault = %self.address))]
    pub async fn set_strategy(&self, caller: &Address, strategy: SharedStrategy) -> Result<()> {
        self.ensure_owner(caller)?;
        if strategy.vault() != self.address {
            return Err(StraddleError::InvalidArgument(format!(
                "strategy {} is bound to vault {}",
                strategy.address(),
                strategy.vault()
            )));
        }

        let _guard = self.purchase_lock.lock().await;
        let mut slot = self.strategy.write().await;
        if let Some(current) = slot.as_ref() {
            if let Some(round) = current.open_round().await {
                return Err(StraddleError::RoundStillOpen(round));
            }
        }

        info!(strategy = %strategy.address(), name = strategy.name(), "Strategy set");
        *slot = Some(strategy);
        Ok(())
    }

    /// Address of the active strategy, if one is set
    pub async fn strategy_address(&self) -> Option<Address> {
        self.strategy.read().await.as_ref().map(|s| s.address())
    }

    pub async fn quote_cost(&self, strike_id: StrikeId, amount: u128) -> Result<StraddleQuote> {
        self.active_strategy().await?.quote_cost(strike_id, amount).await
    }

    /// Open a straddle funded by this vault
    ///
    /// The strategy gets an allowance of exactly the quoted collateral for the
    /// duration of the call; it is revoked afterwards whatever the outcome.
    ///
    /// # Arguments
    /// * `caller` - Must be the vault owner
    /// * `strike_id` - Strike shared by both legs
    /// * `amount` - Fixed-point contract amount per leg
    /// * `max_cost` - Upper bound on the collateral spent
    #[instrument(skip(self), fields(vault = %self.address))]
    pub async fn buy_straddle(
        &self,
        caller: &Address,
        strike_id: StrikeId,
        amount: u128,
        max_cost: Decimal,
    ) -> Result<StraddlePosition> {
        self.ensure_owner(caller)?;
        let _guard = self.purchase_lock.lock().await;
        let strategy = self.active_strategy().await?;

        let quote = match strategy.quote_cost(strike_id, amount).await {
            Ok(quote) => quote,
            Err(StraddleError::MarketUnavailable(reason)) => {
                return Err(StraddleError::InvalidArgument(reason))
            }
            Err(e) => return Err(e),
        };
        CollateralSizer::ensure_within(&quote, max_cost)?;

        let spender = strategy.address();
        self.ledger
            .approve(&self.address, Asset::Quote, &spender, quote.total)
            .await?;
        debug!(%spender, allowance = %quote.total, "Collateral approved");

        let result = strategy
            .buy_straddle(&self.address, strike_id, amount, max_cost)
            .await;

        if let Err(e) = self
            .ledger
            .approve(&self.address, Asset::Quote, &spender, Decimal::ZERO)
            .await
        {
            error!(%spender, error = %e, "Failed to revoke strategy allowance");
        }

        result
    }

    /// Close both legs of a round; proceeds land back in the vault
    #[instrument(skip(self), fields(vault = %self.address))]
    pub async fn close_straddle(&self, caller: &Address, round_index: u64) -> Result<StraddlePosition> {
        self.ensure_owner(caller)?;
        let _guard = self.purchase_lock.lock().await;
        self.active_strategy()
            .await?
            .close_straddle(&self.address, round_index)
            .await
    }

    pub async fn view_position(&self, round_index: u64) -> Result<StraddlePosition> {
        self.active_strategy().await?.view_position(round_index).await
    }

    /// Owners of the call and put position tokens of a round
    pub async fn position_owners(&self, round_index: u64) -> Result<(Address, Address)> {
        self.active_strategy().await?.leg_owners(round_index).await
    }

    pub async fn balances(&self) -> Result<VaultBalances> {
        let (quote, base) = try_join(
            self.ledger.balance_of(Asset::Quote, &self.address),
            self.ledger.balance_of(Asset::Base, &self.address),
        )
        .await?;

        Ok(VaultBalances {
            address: self.address,
            quote,
            base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyConfig;
    use crate::paper::PaperLedger;
    use crate::strategy::StraddleStrategy;
    use rust_decimal_macros::dec;

    fn owner() -> Address {
        Address::from_low_u64(0xD3)
    }

    fn vault_address() -> Address {
        Address::from_low_u64(0x1001)
    }

    async fn funded_vault() -> CollateralVault {
        let ledger = Arc::new(PaperLedger::new());
        ledger.mint(Asset::Quote, &vault_address(), dec!(1500000)).await.unwrap();
        CollateralVault::new(vault_address(), owner(), ledger)
    }

    #[tokio::test]
    async fn test_balances() {
        let vault = funded_vault().await;
        let balances = vault.balances().await.unwrap();
        assert_eq!(balances.quote, dec!(1500000));
        assert_eq!(balances.base, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_set_strategy_owner_only() {
        let vault = funded_vault().await;
        let strategy: SharedStrategy = Arc::new(StraddleStrategy::new(
            Address::from_low_u64(0x2001),
            owner(),
            vault_address(),
            StrategyConfig::default(),
        ));

        let stranger = Address::from_low_u64(0x99);
        assert!(matches!(
            vault.set_strategy(&stranger, strategy.clone()).await,
            Err(StraddleError::NotAuthorized(_))
        ));

        vault.set_strategy(&owner(), strategy).await.unwrap();
        assert_eq!(vault.strategy_address().await, Some(Address::from_low_u64(0x2001)));
    }

    #[tokio::test]
    async fn test_set_strategy_rejects_foreign_binding() {
        let vault = funded_vault().await;
        let strategy: SharedStrategy = Arc::new(StraddleStrategy::new(
            Address::from_low_u64(0x2001),
            owner(),
            Address::from_low_u64(0x1002),
            StrategyConfig::default(),
        ));
        assert!(matches!(
            vault.set_strategy(&owner(), strategy).await,
            Err(StraddleError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_buy_without_strategy() {
        let vault = funded_vault().await;
        let err = vault
            .buy_straddle(&owner(), StrikeId(2), 100_000, dec!(100))
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::NotInitialized(_)));
    }
}
