//! Trust check applied before a strategy trades

use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::errors::{Result, StraddleError};
use crate::common::traits::FeeCounterRegistry;
use crate::common::types::Address;
use crate::config::types::TrustPolicy;

/// Outcome of a trust check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// Counter is registered; trades earn incentive credit
    Eligible,
    /// Counter is not registered but the policy lets it trade
    Ineligible,
}

impl TrustDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, TrustDecision::Eligible)
    }
}

/// Fee counter registry paired with the policy that interprets it
#[derive(Clone)]
pub struct TrustGate {
    registry: Arc<dyn FeeCounterRegistry>,
    policy: TrustPolicy,
}

impl TrustGate {
    pub fn new(registry: Arc<dyn FeeCounterRegistry>, policy: TrustPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> TrustPolicy {
        self.policy
    }

    /// Register or revoke `counter`. Setting the current value is a no-op.
    pub async fn register_trusted(&self, caller: &Address, counter: &Address, trusted: bool) -> Result<bool> {
        self.registry.set_trusted_counter(caller, counter, trusted).await
    }

    pub async fn is_trusted(&self, counter: &Address) -> Result<bool> {
        self.registry.is_trusted_counter(counter).await
    }

    /// Decide whether `counter` may trade under the configured policy
    pub async fn check(&self, counter: &Address) -> Result<TrustDecision> {
        let trusted = self.registry.is_trusted_counter(counter).await?;
        match (trusted, self.policy) {
            (true, _) => {
                debug!(%counter, "Counter trusted");
                Ok(TrustDecision::Eligible)
            }
            (false, TrustPolicy::Required) => Err(StraddleError::CounterNotTrusted(format!(
                "{} must be registered as a trusted fee counter before trading",
                counter
            ))),
            (false, TrustPolicy::Advisory) => {
                warn!(%counter, "Counter not trusted, trade will not earn incentive credit");
                Ok(TrustDecision::Ineligible)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::registry::InMemoryFeeCounter;

    fn setup(policy: TrustPolicy) -> (TrustGate, Address, Address) {
        let owner = Address::from_low_u64(1);
        let counter = Address::from_low_u64(2);
        let gate = TrustGate::new(Arc::new(InMemoryFeeCounter::new(owner)), policy);
        (gate, owner, counter)
    }

    #[tokio::test]
    async fn test_required_policy_blocks_untrusted() {
        let (gate, owner, counter) = setup(TrustPolicy::Required);

        let err = gate.check(&counter).await.unwrap_err();
        assert!(matches!(err, StraddleError::CounterNotTrusted(_)));

        gate.register_trusted(&owner, &counter, true).await.unwrap();
        assert_eq!(gate.check(&counter).await.unwrap(), TrustDecision::Eligible);
    }

    #[tokio::test]
    async fn test_advisory_policy_lets_untrusted_trade() {
        let (gate, _, counter) = setup(TrustPolicy::Advisory);
        let decision = gate.check(&counter).await.unwrap();
        assert!(!decision.is_eligible());
    }

    #[tokio::test]
    async fn test_register_twice_is_noop() {
        let (gate, owner, counter) = setup(TrustPolicy::Required);
        assert!(gate.register_trusted(&owner, &counter, true).await.unwrap());
        assert!(!gate.register_trusted(&owner, &counter, true).await.unwrap());
        assert!(gate.is_trusted(&counter).await.unwrap());
    }
}
