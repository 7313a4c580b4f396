//! Fee counter trust registration
//!
//! A strategy becomes eligible for incentive routing once the registry owner
//! marks it as a trusted counter (`Unregistered -> Trusted`). Revocation is an
//! administrative action outside the strategy's control.

mod gate;
mod registry;

pub use gate::{TrustDecision, TrustGate};
pub use registry::{FeeCounterSnapshot, InMemoryFeeCounter, TraderFees};
