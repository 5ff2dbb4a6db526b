//! Distribute a new aggregate reserve vector back to the ticks
//!
//! All ticks share the orthogonal direction `u` of the aggregate. A pinned
//! tick keeps its fixed `(k, s)` decomposition along that direction; the
//! interior remainder is split across interior ticks in proportion to their
//! radii, which keeps every interior tick on its own sphere.

use crate::constants::EPSILON;
use crate::consolidation::ConsolidatedState;
use crate::error::{AmmError, AmmResult};
use crate::geometry::SphereGeometry;
use crate::tick::TickStore;
use orbital_types::fixed_point::mul_div;
use orbital_types::{vector, Wad};
use tracing::trace;

/// Write the per-tick reserves implied by `new_total` and verify each tick
///
/// `state` fixes the partition and the boundary sums; the tick store is
/// updated in place, so callers route against a working copy.
pub fn deconsolidate(
    geometry: &SphereGeometry,
    store: &mut TickStore,
    state: &ConsolidatedState,
    new_total: &[Wad],
) -> AmmResult<()> {
    let alpha_total = geometry.parallel_projection(vector::sum(new_total)?)?;
    let (direction, orthogonal_norm) = geometry.orthogonal_direction(new_total)?;

    for id in &state.boundary_ids {
        let tick = store.get_mut(*id)?;
        let s = geometry.boundary_orthogonal_radius(tick.r, tick.k)?;
        let reserves = geometry.compose(tick.k, s, &direction)?;
        tick.set_reserves(reserves)?;
        tick.verify(geometry)?;
    }

    let Some(first_interior) = state.interior_ids.first() else {
        return Ok(());
    };

    let alpha_int = alpha_total - state.k_bound_total;
    let mut w_int = orthogonal_norm - state.s_bound_total;
    if w_int < -EPSILON {
        return Err(AmmError::InvariantViolation {
            tick: *first_interior,
            residual: w_int,
        });
    }
    if w_int.is_negative() {
        w_int = Wad::ZERO;
    }

    let interior_total = geometry.compose(alpha_int, w_int, &direction)?;
    trace!(
        alpha_int = %alpha_int,
        w_int = %w_int,
        interior = state.interior_ids.len(),
        "Interior aggregate"
    );

    for id in &state.interior_ids {
        let tick = store.get_mut(*id)?;
        let reserves = interior_total
            .iter()
            .map(|x| mul_div(*x, tick.r, state.r_int))
            .collect::<Result<Vec<_>, _>>()?;
        tick.set_reserves(reserves)?;
        tick.verify(geometry)?;
    }

    Ok(())
}
