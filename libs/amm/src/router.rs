//! Segmented swap routing
//!
//! A swap is executed as a sequence of segments. Each segment rebuilds the
//! consolidated state, solves the whole remaining input and checks the solved
//! position against the nearest tick boundary before anything is written. If
//! the trade would carry the interior aggregate across a boundary, only the
//! input that reaches the boundary is applied, the tick flips between the
//! interior and boundary groups, and the next segment continues from there.

use crate::consolidation::{consolidate, ConsolidatedState, CrossingCandidate};
use crate::constants::{CROSSING_TOLERANCE, MAX_SEGMENTS, SEGMENT_DUST};
use crate::deconsolidation::deconsolidate;
use crate::error::{AmmError, AmmResult};
use crate::geometry::SphereGeometry;
use crate::solver::{InvariantSolver, SwapDirection};
use crate::tick::TickStore;
use orbital_types::{TickId, Wad};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which way a tick changed groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossingDirection {
    /// Interior tick reached its boundary and was pinned
    Outward,
    /// Pinned tick was released back into the interior
    Inward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickCrossing {
    pub tick: TickId,
    pub direction: CrossingDirection,
}

/// What a routed swap did to the tick store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    /// Output paid by the aggregate, summed over segments
    pub amount_out: Wad,
    /// Input actually placed into tick reserves
    pub amount_consumed: Wad,
    /// Unroutable remainder left after the last crossing
    pub dust: Wad,
    pub segments: usize,
    pub crossings: Vec<TickCrossing>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RouterState {
    Pending(Wad),
    Done,
}

impl RouterState {
    /// Next state once a segment consumed part of `remaining`, plus the
    /// remainder swept as dust
    fn after_segment(remaining: Wad, consumed: Wad) -> (Self, Wad) {
        let left = remaining - consumed;
        if left.is_zero() {
            (RouterState::Done, Wad::ZERO)
        } else if left < SEGMENT_DUST {
            (RouterState::Done, left)
        } else {
            (RouterState::Pending(left), Wad::ZERO)
        }
    }
}

/// Result of a single segment
struct Segment {
    consumed: Wad,
    output: Wad,
    crossing: Option<TickCrossing>,
}

/// Routes one swap through a tick store, segment by segment
pub struct SegmentedRouter<'a> {
    geometry: &'a SphereGeometry,
    store: &'a mut TickStore,
}

impl<'a> SegmentedRouter<'a> {
    pub fn new(geometry: &'a SphereGeometry, store: &'a mut TickStore) -> Self {
        Self { geometry, store }
    }

    /// Route `amount_in` of `direction.token_in` into the pool
    ///
    /// On error the tick store may hold partially applied segments, so it
    /// must be a working copy that is discarded.
    pub fn route(&mut self, direction: SwapDirection, amount_in: Wad) -> AmmResult<RouteOutcome> {
        let mut outcome = RouteOutcome::default();
        let mut state = RouterState::Pending(amount_in);

        for _ in 0..MAX_SEGMENTS {
            let remaining = match state {
                RouterState::Pending(remaining) => remaining,
                RouterState::Done => break,
            };

            let segment = self.run_segment(direction, remaining)?;
            outcome.segments += 1;
            outcome.amount_out += segment.output;
            outcome.amount_consumed += segment.consumed;
            if let Some(crossing) = segment.crossing {
                outcome.crossings.push(crossing);
            }

            let (next, dust) = RouterState::after_segment(remaining, segment.consumed);
            outcome.dust = dust;
            state = next;
        }

        match state {
            RouterState::Done => {
                debug!(
                    segments = outcome.segments,
                    crossings = outcome.crossings.len(),
                    amount_out = %outcome.amount_out,
                    "Swap routed"
                );
                Ok(outcome)
            }
            RouterState::Pending(_) => Err(AmmError::TooManySegments(MAX_SEGMENTS)),
        }
    }

    fn run_segment(&mut self, direction: SwapDirection, remaining: Wad) -> AmmResult<Segment> {
        let state = consolidate(self.geometry, self.store)?;
        if state.is_empty() {
            return Err(AmmError::NoLiquidity);
        }
        if state.r_int.is_zero() {
            return Err(AmmError::NoInteriorLiquidity);
        }

        let new_out = InvariantSolver::solve(self.geometry, &state, direction, remaining)?;
        let (sum_after, _) =
            InvariantSolver::post_trade_sums(&state, direction, remaining, new_out)?;
        let projected = state.interior_projection_norm(self.geometry, sum_after)?;

        let crossing = match state.crosses_outward(projected) {
            Some(candidate) => Some((candidate, CrossingDirection::Outward)),
            None => state
                .crosses_inward(projected)
                .map(|candidate| (candidate, CrossingDirection::Inward)),
        };

        let Some((candidate, crossing_direction)) = crossing else {
            let output = self.apply(&state, direction, remaining, new_out)?;
            return Ok(Segment {
                consumed: remaining,
                output,
                crossing: None,
            });
        };

        let current = state.interior_projection_norm(self.geometry, state.sum_total)?;
        let (consumed, output) =
            if Self::already_at(current, candidate, crossing_direction) {
                // zero-width segment: flip without trading
                (Wad::ZERO, Wad::ZERO)
            } else {
                let delta = InvariantSolver::solve_crossover(
                    self.geometry,
                    &state,
                    direction,
                    candidate.k_norm,
                )?;
                if delta >= remaining {
                    let output = self.apply(&state, direction, remaining, new_out)?;
                    return Ok(Segment {
                        consumed: remaining,
                        output,
                        crossing: None,
                    });
                }
                let crossing_out = InvariantSolver::solve(self.geometry, &state, direction, delta)?;
                (delta, self.apply(&state, direction, delta, crossing_out)?)
            };

        self.flip(candidate.tick, crossing_direction)?;

        debug!(
            tick = %candidate.tick,
            direction = ?crossing_direction,
            consumed = %consumed,
            "Tick boundary crossed"
        );

        Ok(Segment {
            consumed,
            output,
            crossing: Some(TickCrossing {
                tick: candidate.tick,
                direction: crossing_direction,
            }),
        })
    }

    fn already_at(
        current: Wad,
        candidate: CrossingCandidate,
        direction: CrossingDirection,
    ) -> bool {
        match direction {
            CrossingDirection::Outward => current >= candidate.k_norm - CROSSING_TOLERANCE,
            CrossingDirection::Inward => current <= candidate.k_norm + CROSSING_TOLERANCE,
        }
    }

    /// Write the solved aggregate back to the ticks and return the output
    fn apply(
        &mut self,
        state: &ConsolidatedState,
        direction: SwapDirection,
        amount_in: Wad,
        new_out: Wad,
    ) -> AmmResult<Wad> {
        let x_out = state.x_total[direction.token_out];
        if new_out >= x_out {
            return Err(AmmError::InvalidTrade);
        }

        let mut new_total = state.x_total.clone();
        new_total[direction.token_in] += amount_in;
        new_total[direction.token_out] = new_out;
        deconsolidate(self.geometry, self.store, state, &new_total)?;

        Ok(x_out - new_out)
    }

    /// Move a tick between groups, then re-project the unchanged aggregate
    /// under the new partition
    fn flip(&mut self, tick: TickId, direction: CrossingDirection) -> AmmResult<()> {
        self.store.get_mut(tick)?.pinned = direction == CrossingDirection::Outward;

        let state = consolidate(self.geometry, self.store)?;
        let total = state.x_total.clone();
        deconsolidate(self.geometry, self.store, &state, &total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_store(geometry: &SphereGeometry, ticks: &[(i64, i64)]) -> TickStore {
        let mut store = TickStore::new(geometry.token_count());
        for (reserve, k_ratio_pct) in ticks {
            let r = geometry.equal_price_radius(Wad::from_int(*reserve)).unwrap();
            let k = orbital_types::fixed_point::mul(r, Wad::from_ratio(*k_ratio_pct, 100).unwrap())
                .unwrap();
            let id = store.insert(r, k);
            let tick = store.get_mut(id).unwrap();
            tick.reserves = vec![Wad::from_int(*reserve); geometry.token_count()];
            tick.total_shares = Wad::ONE;
        }
        store
    }

    #[test]
    fn test_single_segment_without_boundaries() {
        let geometry = SphereGeometry::new(3).unwrap();
        let mut store = pool_store(&geometry, &[(10_000, 0)]);
        let outcome = SegmentedRouter::new(&geometry, &mut store)
            .route(SwapDirection::new(0, 1), Wad::from_int(100))
            .unwrap();

        assert_eq!(outcome.segments, 1);
        assert!(outcome.crossings.is_empty());
        assert_eq!(outcome.amount_consumed, Wad::from_int(100));
        assert!(outcome.amount_out.is_positive() && outcome.amount_out < Wad::from_int(100));
    }

    #[test]
    fn test_large_trade_pins_boundary_tick() {
        let geometry = SphereGeometry::new(3).unwrap();
        let mut store = pool_store(&geometry, &[(10_000, 0), (10_000, 80)]);
        let outcome = SegmentedRouter::new(&geometry, &mut store)
            .route(SwapDirection::new(0, 1), Wad::from_int(16_000))
            .unwrap();

        assert_eq!(outcome.segments, 2);
        assert_eq!(
            outcome.crossings,
            vec![TickCrossing {
                tick: TickId::new(1),
                direction: CrossingDirection::Outward
            }]
        );
        let pinned = store.get(TickId::new(1)).unwrap();
        assert!(pinned.pinned);
        assert!(pinned.is_on_boundary(&geometry).unwrap());
        for tick in store.iter() {
            tick.verify(&geometry).unwrap();
        }
    }

    #[test]
    fn test_all_pinned_has_no_interior() {
        let geometry = SphereGeometry::new(3).unwrap();
        let mut store = pool_store(&geometry, &[(10_000, 80)]);
        store.get_mut(TickId::new(0)).unwrap().pinned = true;

        let err = SegmentedRouter::new(&geometry, &mut store)
            .route(SwapDirection::new(0, 1), Wad::from_int(1))
            .unwrap_err();
        assert_eq!(err, AmmError::NoInteriorLiquidity);
    }

    #[test]
    fn test_dust_remainder_ends_routing() {
        let amount = Wad::from_int(5);
        assert_eq!(
            RouterState::after_segment(amount, amount),
            (RouterState::Done, Wad::ZERO)
        );

        let dust = SEGMENT_DUST - Wad::from_raw(1);
        assert_eq!(
            RouterState::after_segment(amount, amount - dust),
            (RouterState::Done, dust)
        );

        assert_eq!(
            RouterState::after_segment(amount, amount - SEGMENT_DUST),
            (RouterState::Pending(SEGMENT_DUST), Wad::ZERO)
        );
        // zero-width flips keep the whole amount pending
        assert_eq!(
            RouterState::after_segment(amount, Wad::ZERO),
            (RouterState::Pending(amount), Wad::ZERO)
        );
    }

    #[test]
    fn test_trade_too_small_to_move_torus_output() {
        let geometry = SphereGeometry::new(3).unwrap();
        let mut store = pool_store(&geometry, &[(10_000, 0), (10_000, 80)]);
        SegmentedRouter::new(&geometry, &mut store)
            .route(SwapDirection::new(0, 1), Wad::from_int(16_000))
            .unwrap();

        // the bisection settles on the untouched output reserve
        let err = SegmentedRouter::new(&geometry, &mut store)
            .route(SwapDirection::new(0, 1), Wad::from_raw(1_000))
            .unwrap_err();
        assert_eq!(err, AmmError::InvalidTrade);
    }

    #[test]
    fn test_empty_store_has_no_liquidity() {
        let geometry = SphereGeometry::new(2).unwrap();
        let mut store = TickStore::new(2);
        let err = SegmentedRouter::new(&geometry, &mut store)
            .route(SwapDirection::new(0, 1), Wad::ONE)
            .unwrap_err();
        assert_eq!(err, AmmError::NoLiquidity);
    }
}
