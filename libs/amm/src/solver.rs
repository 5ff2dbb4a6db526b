//! Invariant solvers for one trade segment
//!
//! All solvers work on the consolidated aggregate and answer the same
//! question: after adding `amount_in` of the input token, what is the new
//! output reserve? Only the input and output coordinates move, so the
//! post-trade `Σx` and `Σx²` follow from the pre-trade sums by an O(1) update.

use crate::consolidation::{ConsolidatedState, CurveKind};
use crate::constants::{BISECTION_MAX_ITERATIONS, SOLVER_TOLERANCE};
use crate::error::{AmmError, AmmResult};
use crate::geometry::SphereGeometry;
use orbital_types::fixed_point::{mul, sqrt};
use orbital_types::Wad;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Input and output token of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapDirection {
    pub token_in: usize,
    pub token_out: usize,
}

impl SwapDirection {
    pub fn new(token_in: usize, token_out: usize) -> Self {
        Self {
            token_in,
            token_out,
        }
    }
}

/// Closed-form and numeric invariant solvers
pub struct InvariantSolver;

impl InvariantSolver {
    /// Solve on whichever surface the aggregate currently trades on
    pub fn solve(
        geometry: &SphereGeometry,
        state: &ConsolidatedState,
        direction: SwapDirection,
        amount_in: Wad,
    ) -> AmmResult<Wad> {
        match state.curve() {
            CurveKind::Sphere => Self::solve_sphere(
                state.r_int,
                state.x_total[direction.token_in],
                state.x_total[direction.token_out],
                amount_in,
            ),
            CurveKind::Torus => Self::solve_torus(geometry, state, direction, amount_in),
        }
    }

    /// Closed form on a single sphere of radius `r`
    ///
    /// Keeping `(r − x_in)² + (r − x_out)²` constant gives
    /// `x_out' = r − √((r − x_out)² + 2(r − x_in)a − a²)`.
    pub fn solve_sphere(r: Wad, x_in: Wad, x_out: Wad, amount_in: Wad) -> AmmResult<Wad> {
        let gap_out = r - x_out;
        let gap_in = r - x_in;
        let discriminant =
            gap_out.squared()? + mul(gap_in, amount_in)?.mul_int(2)? - amount_in.squared()?;
        if discriminant.is_negative() {
            return Err(AmmError::NegativeDiscriminant);
        }

        let new_out = r - sqrt(discriminant)?;
        if new_out >= x_out {
            return Err(AmmError::NonPositiveOutput);
        }
        if new_out.is_negative() {
            return Err(AmmError::InsufficientLiquidity);
        }
        Ok(new_out)
    }

    /// `Σx` and `Σx²` after the input coordinate gains `amount_in` and the
    /// output coordinate moves to `new_out`
    pub fn post_trade_sums(
        state: &ConsolidatedState,
        direction: SwapDirection,
        amount_in: Wad,
        new_out: Wad,
    ) -> AmmResult<(Wad, Wad)> {
        let x_in = state.x_total[direction.token_in];
        let x_out = state.x_total[direction.token_out];
        let new_in = x_in + amount_in;

        let sum = state.sum_total + amount_in + (new_out - x_out);
        let sum_squares = state.sum_squares_total - x_in.squared()? + new_in.squared()?
            - x_out.squared()?
            + new_out.squared()?;
        Ok((sum, sum_squares))
    }

    /// Torus residual
    /// `(α − kBound − rInt·√n)² + (‖w‖ − sBound)² − rInt²`
    /// of an aggregate with the given sums
    pub fn torus_residual(
        geometry: &SphereGeometry,
        state: &ConsolidatedState,
        sum: Wad,
        sum_squares: Wad,
    ) -> AmmResult<Wad> {
        let alpha = geometry.parallel_projection(sum)?;
        let orthogonal = geometry.orthogonal_norm(sum, sum_squares)?;
        let parallel_gap = alpha - state.k_bound_total - mul(state.r_int, geometry.sqrt_n())?;
        let orthogonal_gap = orthogonal - state.s_bound_total;
        Ok(parallel_gap.squared()? + orthogonal_gap.squared()? - state.r_int.squared()?)
    }

    /// Bisection for the new output reserve on `[0, x_out]`
    ///
    /// Stops early once `|f| < SOLVER_TOLERANCE`; otherwise returns the upper
    /// end of the final bracket, which pays out the smaller amount.
    pub fn solve_torus(
        geometry: &SphereGeometry,
        state: &ConsolidatedState,
        direction: SwapDirection,
        amount_in: Wad,
    ) -> AmmResult<Wad> {
        let residual_at = |new_out: Wad| -> AmmResult<Wad> {
            let (sum, sum_squares) = Self::post_trade_sums(state, direction, amount_in, new_out)?;
            Self::torus_residual(geometry, state, sum, sum_squares)
        };

        let mut lo = Wad::ZERO;
        let mut hi = state.x_total[direction.token_out];
        let f_lo = residual_at(lo)?;
        let f_hi = residual_at(hi)?;

        if f_lo.abs() < SOLVER_TOLERANCE {
            return Ok(lo);
        }
        if f_hi.abs() < SOLVER_TOLERANCE {
            return Ok(hi);
        }
        if f_lo.is_negative() == f_hi.is_negative() {
            return Err(AmmError::Unbracketed);
        }

        let lo_negative = f_lo.is_negative();
        for iteration in 0..BISECTION_MAX_ITERATIONS {
            let mid = lo + (hi - lo).half();
            let f_mid = residual_at(mid)?;
            if f_mid.abs() < SOLVER_TOLERANCE {
                trace!(iteration, "Torus bisection converged");
                return Ok(mid);
            }
            if f_mid.is_negative() == lo_negative {
                lo = mid;
            } else {
                hi = mid;
            }
            if (hi - lo).raw_value() <= 1 {
                break;
            }
        }

        Ok(hi)
    }

    /// Input amount that moves the interior aggregate exactly onto the
    /// normalized boundary `k_cross_norm`
    ///
    /// The target fixes both `Σx'` and `Σx'²`. With `Σx' = Σx + δ − Δout`
    /// the output change is linear in `δ`, and substituting it into the
    /// `Σx'²` update leaves a quadratic in `δ`; the smallest positive root is
    /// the nearest crossing along the trade.
    pub fn solve_crossover(
        geometry: &SphereGeometry,
        state: &ConsolidatedState,
        direction: SwapDirection,
        k_cross_norm: Wad,
    ) -> AmmResult<Wad> {
        let r_int = state.r_int;
        let alpha_int_target = mul(k_cross_norm, r_int)?;
        let sum_target = geometry.sum_for_projection(alpha_int_target + state.k_bound_total)?;
        let w_int_target = geometry.orthogonal_on_sphere(r_int, alpha_int_target)?;
        let sum_squares_target =
            geometry.sum_squares_for(sum_target, w_int_target + state.s_bound_total)?;

        let x_in = state.x_total[direction.token_in];
        let x_out = state.x_total[direction.token_out];

        // x_out' = e − δ and (x_in + δ)² + (e − δ)² = t
        let e = x_out - (state.sum_total - sum_target);
        let t = sum_squares_target - state.sum_squares_total + x_in.squared()? + x_out.squared()?;

        // δ² + bδ + c = 0
        let b = x_in - e;
        let c = (x_in.squared()? + e.squared()? - t).half();
        let discriminant = b.squared()? - c.mul_int(4)?;
        if discriminant.is_negative() {
            return Err(AmmError::NoCrossoverRoot);
        }

        let root = sqrt(discriminant)?;
        let smaller = (-b - root).half();
        let larger = (-b + root).half();

        [smaller, larger]
            .into_iter()
            .find(|delta| delta.is_positive())
            .ok_or(AmmError::NoPositiveCrossover)
    }
}
