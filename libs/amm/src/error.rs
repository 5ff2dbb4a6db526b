//! # AMM Error Types
//!
//! Every operation aborts atomically on the first error; nothing is retried
//! internally. [`AmmError::category`] groups variants into the failure classes
//! a caller can act on.

use crate::ledger::LedgerError;
use orbital_types::{FixedPointError, TickId, Wad};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure class of an [`AmmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Rejected before any state was touched
    InputValidation,
    /// The trade or deposit is mathematically impossible at the current state
    GeometryInfeasible,
    /// A post-operation sphere or boundary check failed
    InvariantViolation,
    /// Output below the caller's minimum; resubmit with other parameters
    Slippage,
    /// Segment budget exhausted; retry with a smaller trade
    Exhaustion,
    /// The token-ledger collaborator refused a transfer
    Ledger,
    /// Fixed-point overflow or division by zero
    Arithmetic,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmmError {
    // ========================================================================
    // Input validation
    // ========================================================================
    #[error("Invalid pool settings: {0}")]
    InvalidSettings(String),

    #[error("Token index {index} out of range for {token_count} tokens")]
    InvalidTokenIndex { index: usize, token_count: usize },

    #[error("Input and output token must differ (both {index})")]
    SameToken { index: usize },

    #[error("Expected {expected} amounts, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Negative amount for token {token}")]
    NegativeAmount { token: usize },

    #[error("Tick radius must be positive, got {r}")]
    InvalidRadius { r: Wad },

    #[error("Boundary parameter must not be negative, got {k}")]
    InvalidBoundary { k: Wad },

    #[error("Unknown tick {0}")]
    UnknownTick(TickId),

    #[error("Requested {requested} shares but only {available} are held")]
    InsufficientShares { requested: Wad, available: Wad },

    #[error("{0} has no liquidity")]
    EmptyTick(TickId),

    #[error("Pool has no active liquidity")]
    NoLiquidity,

    #[error("{tick} has an empty reserve for token {token}")]
    DepletedReserve { tick: TickId, token: usize },

    #[error("Deposit is too small to mint shares")]
    ZeroShares,

    // ========================================================================
    // Geometry infeasible
    // ========================================================================
    #[error("Deposit lies outside the boundary of {0}")]
    OutsideTick(TickId),

    #[error("Negative discriminant: trade size is infeasible")]
    NegativeDiscriminant,

    #[error("Solved output is not positive")]
    NonPositiveOutput,

    #[error("Trade would drain more than the available reserve")]
    InsufficientLiquidity,

    #[error("Torus invariant is not bracketed: trade size is infeasible")]
    Unbracketed,

    #[error("Crossover quadratic has a negative discriminant")]
    NoCrossoverRoot,

    #[error("Crossover quadratic has no positive root")]
    NoPositiveCrossover,

    #[error("Every active tick is pinned; no interior liquidity to trade against")]
    NoInteriorLiquidity,

    #[error("{tick} would be left with a negative reserve of token {token}")]
    TickDepleted { tick: TickId, token: usize },

    #[error("Solved output reserve is not below its pre-trade value")]
    InvalidTrade,

    // ========================================================================
    // Invariant violations
    // ========================================================================
    #[error("Sphere invariant violated on {tick}: residual {residual}")]
    InvariantViolation { tick: TickId, residual: Wad },

    #[error("Boundary constraint violated on {tick}: projection {projection} vs k {k}")]
    BoundaryViolation { tick: TickId, projection: Wad, k: Wad },

    // ========================================================================
    // Slippage and exhaustion
    // ========================================================================
    #[error("Slippage: output {amount_out} below minimum {min_amount_out}")]
    SlippageExceeded { amount_out: Wad, min_amount_out: Wad },

    #[error("Too many segments: swap not finished after {0}")]
    TooManySegments(usize),

    // ========================================================================
    // Collaborators and arithmetic
    // ========================================================================
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] FixedPointError),
}

/// Result type using AMM errors
pub type AmmResult<T> = Result<T, AmmError>;

impl AmmError {
    pub fn category(&self) -> ErrorCategory {
        use AmmError::*;
        match self {
            InvalidSettings(_)
            | InvalidTokenIndex { .. }
            | SameToken { .. }
            | LengthMismatch { .. }
            | ZeroAmount
            | NegativeAmount { .. }
            | InvalidRadius { .. }
            | InvalidBoundary { .. }
            | UnknownTick(_)
            | InsufficientShares { .. }
            | EmptyTick(_)
            | NoLiquidity
            | DepletedReserve { .. }
            | ZeroShares => ErrorCategory::InputValidation,

            OutsideTick(_)
            | NegativeDiscriminant
            | NonPositiveOutput
            | InsufficientLiquidity
            | Unbracketed
            | NoCrossoverRoot
            | NoPositiveCrossover
            | NoInteriorLiquidity
            | TickDepleted { .. }
            | InvalidTrade => ErrorCategory::GeometryInfeasible,

            InvariantViolation { .. } | BoundaryViolation { .. } => {
                ErrorCategory::InvariantViolation
            }

            SlippageExceeded { .. } => ErrorCategory::Slippage,
            TooManySegments(_) => ErrorCategory::Exhaustion,
            Ledger(_) => ErrorCategory::Ledger,
            FixedPoint(_) => ErrorCategory::Arithmetic,
        }
    }

    /// Whether the caller can reasonably resubmit with different parameters
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Slippage | ErrorCategory::Exhaustion | ErrorCategory::Ledger
        )
    }
}
