//! Numeric constants of the invariant, solver and router
//!
//! Iteration caps and tolerances are part of the determinism contract: two
//! pools fed the same operations must land on the same raw integers, and
//! every solver must terminate within a fixed amount of work.

use orbital_types::Wad;

pub use orbital_config::BPS_DENOMINATOR;
pub use orbital_types::fixed_point::SQRT_MAX_ITERATIONS;
pub use orbital_types::vector::NTH_ROOT_ITERATIONS;

/// Sphere-invariant and boundary-inequality tolerance (0.001)
pub const EPSILON: Wad = Wad::from_raw(1_000_000_000_000_000);

/// "Exactly on the boundary plane" tolerance for pinned ticks (1e-6)
pub const BOUNDARY_TOLERANCE: Wad = Wad::from_raw(1_000_000_000_000);

/// Normalized `k/r` overshoot that counts as crossing a tick boundary (1e-9)
pub const CROSSING_TOLERANCE: Wad = Wad::from_raw(1_000_000_000);

/// Early-exit threshold of the torus bisection on `|f|`
pub const SOLVER_TOLERANCE: Wad = Wad::from_raw(EPSILON.raw_value() / 1_000);

/// Remaining input below which the router stops opening segments
pub const SEGMENT_DUST: Wad = Wad::from_raw(1_000);

/// Maximum number of segments a single swap may be split into
pub const MAX_SEGMENTS: usize = 64;

/// Hard cap on bisection steps when solving the torus invariant
pub const BISECTION_MAX_ITERATIONS: usize = 80;

/// Per-token gap within which first-deposit amounts count as already sitting
/// at the pool's current point
pub const PLACEMENT_TOLERANCE: Wad = Wad::from_raw(1_000);
