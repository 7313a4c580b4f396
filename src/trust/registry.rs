//! In-memory fee counter registry

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::common::errors::{Result, StraddleError};
use crate::common::traits::FeeCounterRegistry;
use crate::common::types::Address;

/// Volume credited to one trader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraderFees {
    pub trades: u64,
    /// Fixed-point contract volume
    pub volume: u128,
    pub total_cost: Decimal,
    pub total_fee: Decimal,
}

/// Serializable registry state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeCounterSnapshot {
    pub trusted: HashMap<Address, bool>,
    pub fees: HashMap<Address, TraderFees>,
}

/// Trust list owned by a single administrator
pub struct InMemoryFeeCounter {
    owner: Address,
    state: RwLock<FeeCounterSnapshot>,
}

impl InMemoryFeeCounter {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            state: RwLock::new(FeeCounterSnapshot::default()),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Fees credited to `trader` so far
    pub async fn fees_of(&self, trader: &Address) -> TraderFees {
        self.state
            .read()
            .await
            .fees
            .get(trader)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn snapshot(&self) -> FeeCounterSnapshot {
        self.state.read().await.clone()
    }

    pub async fn restore(&self, snapshot: FeeCounterSnapshot) {
        *self.state.write().await = snapshot;
    }
}

#[async_trait]
impl FeeCounterRegistry for InMemoryFeeCounter {
    async fn set_trusted_counter(&self, caller: &Address, counter: &Address, trusted: bool) -> Result<bool> {
        if *caller != self.owner {
            return Err(StraddleError::NotAuthorized(format!(
                "{} does not own the fee counter registry",
                caller
            )));
        }

        let mut state = self.state.write().await;
        let previous = state.trusted.get(counter).copied().unwrap_or(false);
        if previous == trusted {
            debug!(%counter, trusted, "Trust flag unchanged");
            return Ok(false);
        }

        if trusted {
            state.trusted.insert(*counter, true);
        } else {
            state.trusted.remove(counter);
        }
        info!(%counter, trusted, "Updated trusted counter");
        Ok(true)
    }

    async fn is_trusted_counter(&self, counter: &Address) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .trusted
            .get(counter)
            .copied()
            .unwrap_or(false))
    }

    async fn track_fee(
        &self,
        counter: &Address,
        trader: &Address,
        amount: u128,
        total_cost: Decimal,
        total_fee: Decimal,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.trusted.get(counter).copied().unwrap_or(false) {
            return Err(StraddleError::CounterNotTrusted(counter.to_string()));
        }

        let entry = state.fees.entry(*trader).or_default();
        entry.trades += 1;
        entry.volume = entry.volume.saturating_add(amount);
        entry.total_cost += total_cost;
        entry.total_fee += total_fee;
        debug!(%counter, %trader, amount, %total_fee, "Tracked fee");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn owner() -> Address {
        Address::from_low_u64(1)
    }

    fn counter() -> Address {
        Address::from_low_u64(2)
    }

    #[tokio::test]
    async fn test_registration_is_idempotent() {
        let registry = InMemoryFeeCounter::new(owner());

        assert!(registry.set_trusted_counter(&owner(), &counter(), true).await.unwrap());
        assert!(!registry.set_trusted_counter(&owner(), &counter(), true).await.unwrap());
        assert!(registry.is_trusted_counter(&counter()).await.unwrap());
        assert_eq!(registry.snapshot().await.trusted.len(), 1);
    }

    #[tokio::test]
    async fn test_only_owner_registers() {
        let registry = InMemoryFeeCounter::new(owner());
        let err = registry
            .set_trusted_counter(&counter(), &counter(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::NotAuthorized(_)));
        assert!(!registry.is_trusted_counter(&counter()).await.unwrap());
    }

    #[tokio::test]
    async fn test_revocation() {
        let registry = InMemoryFeeCounter::new(owner());
        registry.set_trusted_counter(&owner(), &counter(), true).await.unwrap();
        assert!(registry.set_trusted_counter(&owner(), &counter(), false).await.unwrap());
        assert!(!registry.is_trusted_counter(&counter()).await.unwrap());
    }

    #[tokio::test]
    async fn test_track_fee_requires_trust() {
        let registry = InMemoryFeeCounter::new(owner());
        let trader = Address::from_low_u64(3);

        let err = registry
            .track_fee(&counter(), &trader, 10, dec!(5), dec!(0.5))
            .await
            .unwrap_err();
        assert!(matches!(err, StraddleError::CounterNotTrusted(_)));

        registry.set_trusted_counter(&owner(), &counter(), true).await.unwrap();
        registry.track_fee(&counter(), &trader, 10, dec!(5), dec!(0.5)).await.unwrap();
        registry.track_fee(&counter(), &trader, 5, dec!(2), dec!(0.2)).await.unwrap();

        assert_eq!(
            registry.fees_of(&trader).await,
            TraderFees {
                trades: 2,
                volume: 15,
                total_cost: dec!(7),
                total_fee: dec!(0.7),
            }
        );
    }
}
