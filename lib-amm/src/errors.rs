//! Pool engine errors

use lib_types::{Amount, AssetId, Bps, PoolId};
use thiserror::Error;

use crate::custody::CustodyError;

/// Error during pool ledger, swap or routing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmmError {
    #[error("assets must be different")]
    IdenticalAssets,

    #[error("pool not found: {0}")]
    PoolNotFound(PoolId),

    #[error("no pool found for pair {0}/{1}")]
    NoPoolForPair(AssetId, AssetId),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("pool {0} has zero reserves")]
    ZeroReserves(PoolId),

    #[error("deposit would mint zero claims")]
    ZeroClaimsMinted,

    #[error("insufficient claim balance: have {have}, need {need}")]
    InsufficientClaims { have: Amount, need: Amount },

    #[error("slippage tolerance exceeded: output {amount_out} below minimum {min_out}")]
    SlippageExceeded { amount_out: Amount, min_out: Amount },

    #[error("swap input {amount_in} exceeds half of input reserve {reserve_in}")]
    DrainProtection { amount_in: Amount, reserve_in: Amount },

    #[error("fee bps out of range: {0}")]
    FeeBpsOutOfRange(Bps),

    #[error("referral bps out of range: {0}")]
    RefBpsOutOfRange(Bps),

    #[error("referral requires the anchor asset in the pair")]
    ReferralRequiresAnchor,

    #[error("arithmetic out of bounds")]
    OutOfBounds,

    #[error("computed output {amount_out} out of range for reserve {reserve_out}")]
    OutputOutOfRange { amount_out: Amount, reserve_out: Amount },

    #[error("system authority required")]
    Unauthorized,

    #[error(transparent)]
    Custody(#[from] CustodyError),

    /// Indicates a logic bug, not a business condition. Callers must treat
    /// the whole instruction as failed and halt further processing.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Result type for pool engine operations
pub type AmmResult<T> = Result<T, AmmError>;
