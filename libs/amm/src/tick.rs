//! Tick records and the tick arena
//!
//! Ticks live in a growable array addressed by [`TickId`]; handles are dense
//! and never reused, and a tick is never removed (only drained to zero
//! shares). Each tick owns its share ledger.

use crate::constants::{BOUNDARY_TOLERANCE, EPSILON};
use crate::error::{AmmError, AmmResult};
use crate::geometry::SphereGeometry;
use orbital_types::fixed_point::div;
use orbital_types::{vector, AccountId, TickId, Wad};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One independently parametrized liquidity position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub id: TickId,
    /// Sphere radius
    pub r: Wad,
    /// Boundary plane `x·v = k`; zero for interior-only ticks
    pub k: Wad,
    /// Resting exactly on the boundary plane
    pub pinned: bool,
    pub reserves: Vec<Wad>,
    pub total_shares: Wad,
    pub shares: BTreeMap<AccountId, Wad>,
}

/// Read-only snapshot of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickInfo {
    pub id: TickId,
    pub r: Wad,
    pub k: Wad,
    pub pinned: bool,
    pub reserves: Vec<Wad>,
    pub total_shares: Wad,
    pub owners: usize,
}

/// Pool-wide sums over ticks holding shares, recomputed on every read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    pub total_reserves: Vec<Wad>,
    pub total_r: Wad,
    pub total_r_squared: Wad,
    pub active_ticks: usize,
    pub tick_count: usize,
}

/// Where the live ticks currently sit: reserves on a sphere of radius `r`
///
/// Every interior tick is this point scaled to its own radius.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPoint {
    pub reserves: Vec<Wad>,
    pub r: Wad,
}

impl Tick {
    pub fn new(id: TickId, r: Wad, k: Wad, token_count: usize) -> Self {
        Self {
            id,
            r,
            k,
            pinned: false,
            reserves: vec![Wad::ZERO; token_count],
            total_shares: Wad::ZERO,
            shares: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn has_liquidity(&self) -> bool {
        self.total_shares.is_positive()
    }

    #[inline]
    pub fn carries_boundary(&self) -> bool {
        self.k.is_positive()
    }

    /// Trades as part of the pinned boundary group
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.carries_boundary() && self.pinned
    }

    /// `k / r`, the boundary position independent of tick size
    pub fn normalized_boundary(&self) -> AmmResult<Wad> {
        Ok(div(self.k, self.r)?)
    }

    pub fn shares_of(&self, owner: &AccountId) -> Wad {
        self.shares.get(owner).copied().unwrap_or(Wad::ZERO)
    }

    /// `x·v`
    pub fn projection(&self, geometry: &SphereGeometry) -> AmmResult<Wad> {
        geometry.parallel_projection(vector::sum(&self.reserves)?)
    }

    pub fn sphere_residual(&self, geometry: &SphereGeometry) -> AmmResult<Wad> {
        geometry.sphere_residual(self.r, &self.reserves)
    }

    pub fn is_on_boundary(&self, geometry: &SphereGeometry) -> AmmResult<bool> {
        if !self.carries_boundary() || !self.has_liquidity() {
            return Ok(false);
        }
        Ok((self.projection(geometry)? - self.k).abs() <= BOUNDARY_TOLERANCE)
    }

    /// Check the sphere invariant, the boundary inequality and, when pinned,
    /// the boundary equality
    pub fn verify(&self, geometry: &SphereGeometry) -> AmmResult<()> {
        if !self.has_liquidity() {
            return Ok(());
        }

        let residual = self.sphere_residual(geometry)?;
        if residual.abs() >= EPSILON {
            return Err(AmmError::InvariantViolation {
                tick: self.id,
                residual,
            });
        }

        if self.carries_boundary() {
            let projection = self.projection(geometry)?;
            let violated = projection > self.k + EPSILON
                || (self.pinned && (projection - self.k).abs() > BOUNDARY_TOLERANCE);
            if violated {
                return Err(AmmError::BoundaryViolation {
                    tick: self.id,
                    projection,
                    k: self.k,
                });
            }
        }

        Ok(())
    }

    /// Replace the reserve vector, rejecting negative entries
    pub fn set_reserves(&mut self, reserves: Vec<Wad>) -> AmmResult<()> {
        if let Some(token) = reserves.iter().position(|x| x.is_negative()) {
            return Err(AmmError::TickDepleted {
                tick: self.id,
                token,
            });
        }
        self.reserves = reserves;
        Ok(())
    }

    pub fn info(&self) -> TickInfo {
        TickInfo {
            id: self.id,
            r: self.r,
            k: self.k,
            pinned: self.pinned,
            reserves: self.reserves.clone(),
            total_shares: self.total_shares,
            owners: self.shares.len(),
        }
    }
}

/// Arena of ticks addressed by integer handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickStore {
    token_count: usize,
    ticks: Vec<Tick>,
}

impl TickStore {
    pub fn new(token_count: usize) -> Self {
        Self {
            token_count,
            ticks: Vec::new(),
        }
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Allocate the next handle for a tick with no liquidity
    pub fn insert(&mut self, r: Wad, k: Wad) -> TickId {
        let id = TickId::new(self.ticks.len() as u64);
        self.ticks.push(Tick::new(id, r, k, self.token_count));
        id
    }

    pub fn get(&self, id: TickId) -> AmmResult<&Tick> {
        self.ticks.get(id.index()).ok_or(AmmError::UnknownTick(id))
    }

    pub fn get_mut(&mut self, id: TickId) -> AmmResult<&mut Tick> {
        self.ticks
            .get_mut(id.index())
            .ok_or(AmmError::UnknownTick(id))
    }

    /// Commit an updated copy of an existing tick
    pub fn replace(&mut self, tick: Tick) -> AmmResult<()> {
        let slot = self.get_mut(tick.id)?;
        *slot = tick;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter()
    }

    /// Current point of the pool, `None` while no tick holds shares
    ///
    /// Interior ticks are summed. With only pinned ticks left, the one with
    /// the widest cap marks the edge the interior last moved through.
    pub fn current_point(&self) -> AmmResult<Option<PoolPoint>> {
        let mut reserves = vec![Wad::ZERO; self.token_count];
        let mut r = Wad::ZERO;
        for tick in self.iter().filter(|t| t.has_liquidity() && !t.pinned) {
            reserves = vector::add(&reserves, &tick.reserves)?;
            r += tick.r;
        }
        if r.is_positive() {
            return Ok(Some(PoolPoint { reserves, r }));
        }

        let mut widest: Option<(&Tick, Wad)> = None;
        for tick in self.active() {
            let ratio = tick.normalized_boundary()?;
            if widest.map_or(true, |(_, best)| ratio > best) {
                widest = Some((tick, ratio));
            }
        }
        Ok(widest.map(|(tick, _)| PoolPoint {
            reserves: tick.reserves.clone(),
            r: tick.r,
        }))
    }

    /// Ticks holding shares
    pub fn active(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter().filter(|t| t.has_liquidity())
    }

    /// Active tick with the largest radius
    pub fn largest_active(&self) -> Option<&Tick> {
        self.active().max_by_key(|t| t.r)
    }

    pub fn global_state(&self) -> AmmResult<GlobalState> {
        let mut total_reserves = vec![Wad::ZERO; self.token_count];
        let mut total_r = Wad::ZERO;
        let mut total_r_squared = Wad::ZERO;
        let mut active_ticks = 0;

        for tick in self.active() {
            total_reserves = vector::add(&total_reserves, &tick.reserves)?;
            total_r += tick.r;
            total_r_squared += tick.r.squared()?;
            active_ticks += 1;
        }

        Ok(GlobalState {
            total_reserves,
            total_r,
            total_r_squared,
            active_ticks,
            tick_count: self.ticks.len(),
        })
    }
}
