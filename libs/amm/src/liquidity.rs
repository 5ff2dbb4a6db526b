//! Tick creation, deposits and withdrawals
//!
//! Deposits and withdrawals are planned against a copy of the tick. The plan
//! carries the updated tick together with the token amounts to settle, and the
//! pool commits the tick only after the ledger accepted the transfers.

use crate::constants::{BOUNDARY_TOLERANCE, EPSILON, PLACEMENT_TOLERANCE};
use crate::error::{AmmError, AmmResult};
use crate::geometry::SphereGeometry;
use crate::tick::{PoolPoint, Tick, TickStore};
use orbital_types::fixed_point::{div, mul, mul_div};
use orbital_types::{vector, AccountId, TickId, Wad};
use tracing::debug;

/// Result of planning a deposit
#[derive(Debug, Clone, PartialEq)]
pub struct DepositPlan {
    pub tick: Tick,
    pub shares_minted: Wad,
    /// Amount of each token pulled from the provider
    pub pulled: Vec<Wad>,
}

/// Result of planning a withdrawal
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalPlan {
    pub tick: Tick,
    pub shares_burned: Wad,
    /// Amount of each token paid to the provider
    pub withdrawn: Vec<Wad>,
}

/// Liquidity bookkeeping for single ticks
pub struct LiquidityManager;

impl LiquidityManager {
    /// Register a tick with no reserves or shares
    pub fn create_tick(store: &mut TickStore, r: Wad, k: Wad) -> AmmResult<TickId> {
        if !r.is_positive() {
            return Err(AmmError::InvalidRadius { r });
        }
        if k.is_negative() {
            return Err(AmmError::InvalidBoundary { k });
        }
        Ok(store.insert(r, k))
    }

    /// Plan a deposit of `amounts` into `tick` on behalf of `provider`
    ///
    /// `current` is where the other live ticks sit; a first deposit joins
    /// them there.
    pub fn plan_deposit(
        geometry: &SphereGeometry,
        tick: &Tick,
        current: Option<&PoolPoint>,
        provider: &AccountId,
        amounts: &[Wad],
    ) -> AmmResult<DepositPlan> {
        if tick.has_liquidity() {
            Self::plan_proportional_deposit(geometry, tick, provider, amounts)
        } else {
            Self::plan_first_deposit(geometry, tick, current, provider, amounts)
        }
    }

    /// The first deposit defines the tick.
    ///
    /// Into an empty pool the reserves become the amounts and the radius is
    /// chosen so an even split sits at the equal-price point; unbalanced
    /// amounts therefore fail the sphere check. Otherwise the tick is the
    /// current point scaled to the largest radius the amounts cover, and any
    /// excess stays with the provider.
    fn plan_first_deposit(
        geometry: &SphereGeometry,
        tick: &Tick,
        current: Option<&PoolPoint>,
        provider: &AccountId,
        amounts: &[Wad],
    ) -> AmmResult<DepositPlan> {
        let (new_r, reserves) = match current {
            Some(point) => Self::place_at(point, amounts)?,
            None => (
                geometry.equal_price_radius(vector::average(amounts)?)?,
                amounts.to_vec(),
            ),
        };

        let minted = vector::geometric_mean(&reserves)?;
        if !minted.is_positive() {
            return Err(AmmError::ZeroShares);
        }

        let mut next = tick.clone();
        if tick.carries_boundary() {
            next.k = mul_div(tick.k, new_r, tick.r)?;
        }
        next.r = new_r;
        next.reserves = reserves.clone();
        next.total_shares = minted;
        next.shares.clear();
        next.shares.insert(provider.clone(), minted);
        next.pinned = false;

        if next.carries_boundary() {
            let projection = next.projection(geometry)?;
            if projection > next.k + EPSILON {
                return Err(AmmError::OutsideTick(tick.id));
            }
            next.pinned = (projection - next.k).abs() <= BOUNDARY_TOLERANCE;
        }

        next.verify(geometry)?;

        debug!(
            tick = %tick.id,
            r = %next.r,
            k = %next.k,
            shares = %minted,
            "Initial deposit planned"
        );

        Ok(DepositPlan {
            tick: next,
            shares_minted: minted,
            pulled: reserves,
        })
    }

    /// Radius and reserves of `point` scaled to fit inside `amounts`
    ///
    /// Amounts already sitting at the point are taken exactly as offered.
    fn place_at(point: &PoolPoint, amounts: &[Wad]) -> AmmResult<(Wad, Vec<Wad>)> {
        let mut radius: Option<Wad> = None;
        for (amount, x) in amounts.iter().zip(&point.reserves) {
            if !x.is_positive() {
                continue;
            }
            let fit = mul_div(*amount, point.r, *x)?;
            radius = Some(radius.map_or(fit, |r| r.min(fit)));
        }
        let radius = radius.ok_or(AmmError::ZeroShares)?;
        if !radius.is_positive() {
            return Err(AmmError::ZeroShares);
        }

        let placed = point
            .reserves
            .iter()
            .map(|x| mul_div(*x, radius, point.r))
            .collect::<Result<Vec<_>, _>>()?;

        let at_point = placed
            .iter()
            .zip(amounts)
            .all(|(p, a)| (*p - *a).abs() <= PLACEMENT_TOLERANCE);
        if at_point {
            Ok((radius, amounts.to_vec()))
        } else {
            Ok((radius, placed))
        }
    }

    /// Later deposits scale the whole tick by the smallest amount/reserve
    /// ratio; only the matching proportional amounts are pulled.
    fn plan_proportional_deposit(
        geometry: &SphereGeometry,
        tick: &Tick,
        provider: &AccountId,
        amounts: &[Wad],
    ) -> AmmResult<DepositPlan> {
        let mut min_ratio: Option<Wad> = None;
        for (token, (amount, reserve)) in amounts.iter().zip(&tick.reserves).enumerate() {
            if !reserve.is_positive() {
                return Err(AmmError::DepletedReserve {
                    tick: tick.id,
                    token,
                });
            }
            let ratio = div(*amount, *reserve)?;
            min_ratio = Some(min_ratio.map_or(ratio, |m| m.min(ratio)));
        }

        let min_ratio = min_ratio.unwrap_or(Wad::ZERO);
        if !min_ratio.is_positive() {
            return Err(AmmError::ZeroShares);
        }
        let minted = mul(tick.total_shares, min_ratio)?;
        if !minted.is_positive() {
            return Err(AmmError::ZeroShares);
        }

        let growth = Wad::ONE + min_ratio;
        let mut next = tick.clone();
        next.reserves = vector::scale(&tick.reserves, growth)?;
        next.r = mul(tick.r, growth)?;
        next.k = mul(tick.k, growth)?;
        next.total_shares += minted;
        *next.shares.entry(provider.clone()).or_insert(Wad::ZERO) += minted;

        next.verify(geometry)?;

        let pulled = vector::sub(&next.reserves, &tick.reserves)?;
        debug!(
            tick = %tick.id,
            ratio = %min_ratio,
            shares = %minted,
            "Proportional deposit planned"
        );

        Ok(DepositPlan {
            tick: next,
            shares_minted: minted,
            pulled,
        })
    }

    /// Plan burning `shares` of `provider` in `tick`
    pub fn plan_withdrawal(
        geometry: &SphereGeometry,
        tick: &Tick,
        provider: &AccountId,
        shares: Wad,
    ) -> AmmResult<WithdrawalPlan> {
        if !shares.is_positive() {
            return Err(AmmError::ZeroAmount);
        }
        let held = tick.shares_of(provider);
        if shares > held {
            return Err(AmmError::InsufficientShares {
                requested: shares,
                available: held,
            });
        }

        let mut next = tick.clone();
        let withdrawn = if shares == tick.total_shares {
            // Last holder out: hand back everything, keep r and k for reuse
            let withdrawn = tick.reserves.clone();
            next.reserves = vec![Wad::ZERO; tick.reserves.len()];
            next.pinned = false;
            withdrawn
        } else {
            let keep = Wad::ONE - div(shares, tick.total_shares)?;
            next.reserves = vector::scale(&tick.reserves, keep)?;
            next.r = mul(tick.r, keep)?;
            next.k = mul(tick.k, keep)?;
            vector::sub(&tick.reserves, &next.reserves)?
        };

        next.total_shares -= shares;
        let remaining = held - shares;
        if remaining.is_zero() {
            next.shares.remove(provider);
        } else {
            next.shares.insert(provider.clone(), remaining);
        }

        next.verify(geometry)?;

        debug!(tick = %tick.id, shares = %shares, "Withdrawal planned");

        Ok(WithdrawalPlan {
            tick: next,
            shares_burned: shares,
            withdrawn,
        })
    }
}
