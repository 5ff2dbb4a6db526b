//! Aggregate view of all active ticks
//!
//! Interior ticks are parallel spheres and add up to one sphere of radius
//! `rInt = Σ r`. Pinned boundary ticks each contribute a fixed parallel
//! component `k` and an orthogonal circle of radius `s`, so together with the
//! interior sphere they trace a torus. The state is rebuilt from scratch
//! before every trade segment and never cached.

use crate::constants::CROSSING_TOLERANCE;
use crate::error::AmmResult;
use crate::geometry::SphereGeometry;
use crate::tick::TickStore;
use orbital_types::fixed_point::div;
use orbital_types::{vector, TickId, Wad};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Invariant surface the aggregate trades on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveKind {
    /// No pinned ticks: closed-form sphere
    Sphere,
    /// At least one pinned tick: torus solved numerically
    Torus,
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveKind::Sphere => write!(f, "sphere"),
            CurveKind::Torus => write!(f, "torus"),
        }
    }
}

/// A tick whose boundary the aggregate may reach next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingCandidate {
    pub tick: TickId,
    /// `k / r` of the tick
    pub k_norm: Wad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedState {
    pub interior_ids: Vec<TickId>,
    pub boundary_ids: Vec<TickId>,
    /// `Σ r` over interior ticks
    pub r_int: Wad,
    /// `Σ k` over boundary ticks
    pub k_bound_total: Wad,
    /// `Σ s` over boundary ticks
    pub s_bound_total: Wad,
    /// Interior tick with a boundary and the smallest `k / r`
    pub interior_crossing: Option<CrossingCandidate>,
    /// Boundary tick with the largest `k / r`
    pub boundary_crossing: Option<CrossingCandidate>,
    pub x_total: Vec<Wad>,
    pub sum_total: Wad,
    pub sum_squares_total: Wad,
}

impl ConsolidatedState {
    pub fn curve(&self) -> CurveKind {
        if self.boundary_ids.is_empty() {
            CurveKind::Sphere
        } else {
            CurveKind::Torus
        }
    }

    /// No active ticks at all
    pub fn is_empty(&self) -> bool {
        self.interior_ids.is_empty() && self.boundary_ids.is_empty()
    }

    /// `(Σx/√n − kBound) / rInt`: where the interior aggregate sits relative
    /// to the normalized boundaries of individual ticks
    pub fn interior_projection_norm(&self, geometry: &SphereGeometry, sum: Wad) -> AmmResult<Wad> {
        let alpha_int = geometry.parallel_projection(sum)? - self.k_bound_total;
        Ok(div(alpha_int, self.r_int)?)
    }

    /// Projected norm passes the next interior boundary
    pub fn crosses_outward(&self, projected_norm: Wad) -> Option<CrossingCandidate> {
        self.interior_crossing
            .filter(|c| projected_norm > c.k_norm + CROSSING_TOLERANCE)
    }

    /// Projected norm falls back inside the outermost pinned boundary
    pub fn crosses_inward(&self, projected_norm: Wad) -> Option<CrossingCandidate> {
        self.boundary_crossing
            .filter(|c| projected_norm < c.k_norm - CROSSING_TOLERANCE)
    }
}

/// Partition the active ticks and accumulate the aggregate sums
pub fn consolidate(geometry: &SphereGeometry, store: &TickStore) -> AmmResult<ConsolidatedState> {
    let mut r_int = Wad::ZERO;
    let mut k_bound_total = Wad::ZERO;
    let mut s_bound_total = Wad::ZERO;
    let mut interior_crossing: Option<CrossingCandidate> = None;
    let mut boundary_crossing: Option<CrossingCandidate> = None;
    let mut x_total = vec![Wad::ZERO; store.token_count()];

    for tick in store.active() {
        x_total = vector::add(&x_total, &tick.reserves)?;

        if tick.is_boundary() {
            k_bound_total += tick.k;
            s_bound_total += geometry.boundary_orthogonal_radius(tick.r, tick.k)?;
            let candidate = CrossingCandidate {
                tick: tick.id,
                k_norm: tick.normalized_boundary()?,
            };
            if boundary_crossing.map_or(true, |c| candidate.k_norm > c.k_norm) {
                boundary_crossing = Some(candidate);
            }
        } else {
            r_int += tick.r;
            if tick.carries_boundary() {
                let candidate = CrossingCandidate {
                    tick: tick.id,
                    k_norm: tick.normalized_boundary()?,
                };
                if interior_crossing.map_or(true, |c| candidate.k_norm < c.k_norm) {
                    interior_crossing = Some(candidate);
                }
            }
        }
    }

    let (boundary_ids, interior_ids): (Vec<TickId>, Vec<TickId>) = store
        .active()
        .map(|t| (t.id, t.is_boundary()))
        .fold((Vec::new(), Vec::new()), |(mut b, mut i), (id, pinned)| {
            if pinned {
                b.push(id);
            } else {
                i.push(id);
            }
            (b, i)
        });

    let sum_total = vector::sum(&x_total)?;
    let sum_squares_total = vector::sum_squares(&x_total)?;

    Ok(ConsolidatedState {
        interior_ids,
        boundary_ids,
        r_int,
        k_bound_total,
        s_bound_total,
        interior_crossing,
        boundary_crossing,
        x_total,
        sum_total,
        sum_squares_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activate(store: &mut TickStore, r: i64, k: i64, reserves: &[i64], pinned: bool) -> TickId {
        let id = store.insert(Wad::from_int(r), Wad::from_int(k));
        let tick = store.get_mut(id).unwrap();
        tick.reserves = reserves.iter().map(|x| Wad::from_int(*x)).collect();
        tick.total_shares = Wad::ONE;
        tick.pinned = pinned;
        id
    }

    #[test]
    fn test_partition_and_sums() {
        let geometry = SphereGeometry::new(2).unwrap();
        let mut store = TickStore::new(2);
        let plain = activate(&mut store, 10, 0, &[3, 4], false);
        let wide = activate(&mut store, 20, 18, &[5, 6], false);
        let narrow = activate(&mut store, 20, 14, &[7, 8], false);
        let pinned = activate(&mut store, 10, 9, &[1, 2], true);
        // no shares, ignored
        store.insert(Wad::from_int(50), Wad::ZERO);

        let state = consolidate(&geometry, &store).unwrap();
        assert_eq!(state.interior_ids, vec![plain, wide, narrow]);
        assert_eq!(state.boundary_ids, vec![pinned]);
        assert_eq!(state.r_int, Wad::from_int(50));
        assert_eq!(state.k_bound_total, Wad::from_int(9));
        assert_eq!(state.x_total, vec![Wad::from_int(16), Wad::from_int(20)]);
        assert_eq!(state.sum_total, Wad::from_int(36));
        assert_eq!(state.sum_squares_total, Wad::from_int(16 * 16 + 20 * 20));
        assert_eq!(state.curve(), CurveKind::Torus);

        // the tighter interior cap is reached first
        assert_eq!(state.interior_crossing.map(|c| c.tick), Some(narrow));
        assert_eq!(state.boundary_crossing.map(|c| c.tick), Some(pinned));
    }

    #[test]
    fn test_crossing_detection_uses_tolerance() {
        let geometry = SphereGeometry::new(2).unwrap();
        let mut store = TickStore::new(2);
        activate(&mut store, 10, 8, &[3, 3], false);
        let state = consolidate(&geometry, &store).unwrap();
        assert_eq!(state.curve(), CurveKind::Sphere);

        let at_boundary = Wad::from_ratio(8, 10).unwrap();
        assert!(state.crosses_outward(at_boundary).is_none());
        assert!(state
            .crosses_outward(at_boundary + CROSSING_TOLERANCE + Wad::from_raw(1))
            .is_some());
        assert!(state.crosses_inward(Wad::ZERO).is_none());
    }
}
