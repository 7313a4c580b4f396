//! Error types for the straddle executor

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{Leg, PositionId};

/// Result type alias using our StraddleError
pub type Result<T> = std::result::Result<T, StraddleError>;

/// Main error type for vault, strategy and collaborator operations
#[derive(Error, Debug)]
pub enum StraddleError {
    /// Bad strike or amount supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Strike is not listed on a live board
    #[error("Market unavailable: {0}")]
    MarketUnavailable(String),

    /// Vault balance or allowance does not cover the required collateral
    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral { required: Decimal, available: Decimal },

    /// Freshly read cost exceeds the caller's bound
    #[error("Slippage exceeded: quoted {quoted}, max cost {max_cost}")]
    SlippageExceeded { quoted: Decimal, max_cost: Decimal },

    /// A leg was rejected before any straddle state was persisted
    #[error("{leg} leg execution failed: {reason}")]
    LegExecutionFailed { leg: Leg, reason: String },

    /// The second leg failed and the first could not be unwound
    #[error("Straddle partially executed: orphaned {orphaned_leg} leg position {position_id}: {reason}")]
    PartiallyExecutedStraddle {
        orphaned_leg: Leg,
        position_id: PositionId,
        reason: String,
    },

    /// Caller lacks the authority for a privileged action
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Lookup of a round or position that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Collaborators were already wired
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    /// Collaborators have not been wired yet
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Strategy is not a trusted fee counter under a strict trust policy
    #[error("Counter not trusted: {0}")]
    CounterNotTrusted(String),

    /// A straddle round is still open
    #[error("Round {0} is still open")]
    RoundStillOpen(u64),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// State file read/write errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StraddleError {
    /// Process exit code for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            StraddleError::InvalidArgument(_) => 2,
            StraddleError::MarketUnavailable(_) => 3,
            StraddleError::InsufficientCollateral { .. } => 4,
            StraddleError::SlippageExceeded { .. } => 5,
            StraddleError::LegExecutionFailed { .. } => 6,
            StraddleError::PartiallyExecutedStraddle { .. } => 7,
            StraddleError::NotAuthorized(_) => 8,
            StraddleError::NotFound(_) => 9,
            StraddleError::AlreadyInitialized(_) | StraddleError::NotInitialized(_) => 10,
            StraddleError::CounterNotTrusted(_) => 11,
            StraddleError::RoundStillOpen(_) => 12,
            StraddleError::Timeout(_) => 13,
            StraddleError::Configuration(_) => 14,
            StraddleError::Persistence(_) => 15,
            StraddleError::Internal(_) => 1,
        }
    }

    /// Whether the failure needs manual reconciliation by an operator.
    ///
    /// Everything else is an ordinary outcome the caller handles by
    /// re-quoting, re-funding or fixing its input.
    pub fn requires_operator(&self) -> bool {
        matches!(self, StraddleError::PartiallyExecutedStraddle { .. })
    }
}

impl From<serde_json::Error> for StraddleError {
    fn from(err: serde_json::Error) -> Self {
        StraddleError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for StraddleError {
    fn from(err: std::io::Error) -> Self {
        StraddleError::Persistence(err.to_string())
    }
}
