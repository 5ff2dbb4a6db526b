//! # Orbital AMM Library - N-Token Sphere Liquidity Engine
//!
//! ## Purpose
//!
//! Deterministic fixed-point engine for an n-token automated market maker in
//! which every liquidity position ("tick") keeps its reserves on a sphere
//! `Σ(r − xᵢ)² = r²`. Ticks may carry a boundary plane `x·v = k` that caps how
//! far their reserves drift from the equal-price point; a tick resting on its
//! plane is pinned and trades as part of a torus-shaped aggregate.
//!
//! ## Components
//!
//! - [`tick`]: tick records, the tick arena and pool-wide views
//! - [`liquidity`]: tick creation, deposits and withdrawals
//! - [`consolidation`]: interior/boundary partition and aggregate sums
//! - [`solver`]: sphere closed form, torus bisection, crossover quadratic
//! - [`router`]: segmented swaps that stop at tick boundaries
//! - [`deconsolidation`]: projecting the aggregate back onto each tick
//! - [`ledger`]: token custody seam with all-or-nothing settlement
//! - [`pool`]: the [`OrbitalPool`] facade
//!
//! ## Determinism
//!
//! All arithmetic is 18-decimal fixed point ([`Wad`]) with truncating
//! rounding and fixed iteration caps, so the same sequence of operations
//! always produces the same raw integers.

pub mod consolidation;
pub mod constants;
pub mod deconsolidation;
pub mod error;
pub mod geometry;
pub mod ledger;
pub mod liquidity;
pub mod pool;
pub mod pool_traits;
pub mod router;
pub mod solver;
pub mod tick;

pub use consolidation::{consolidate, ConsolidatedState, CrossingCandidate, CurveKind};
pub use deconsolidation::deconsolidate;
pub use error::{AmmError, AmmResult, ErrorCategory};
pub use geometry::SphereGeometry;
pub use ledger::{InMemoryLedger, LedgerError, Settlement, TokenLedger};
pub use liquidity::{DepositPlan, LiquidityManager, WithdrawalPlan};
pub use pool::{OrbitalPool, SwapReceipt};
pub use pool_traits::AmmPool;
pub use router::{CrossingDirection, RouteOutcome, SegmentedRouter, TickCrossing};
pub use solver::{InvariantSolver, SwapDirection};
pub use tick::{GlobalState, PoolPoint, Tick, TickInfo, TickStore};

/// Common types for pool callers
pub use orbital_types::{AccountId, TickId, Wad};
pub use rust_decimal::Decimal;
