//! Orbital pool facade
//!
//! Every mutating operation follows the same shape: validate, plan against a
//! copy of the affected state, settle the token transfers, then commit. A
//! failure at any step leaves the pool exactly as it was.

use crate::consolidation::{consolidate, ConsolidatedState};
use crate::error::{AmmError, AmmResult};
use crate::geometry::SphereGeometry;
use crate::ledger::{InMemoryLedger, Settlement, TokenLedger};
use crate::liquidity::LiquidityManager;
use crate::router::{SegmentedRouter, TickCrossing};
use crate::solver::SwapDirection;
use crate::tick::{GlobalState, TickInfo, TickStore};
use orbital_config::{PoolConfig, PoolSettings, BPS_DENOMINATOR};
use orbital_types::fixed_point::{div, mul_div};
use orbital_types::{AccountId, TickId, Wad};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Result of a swap, or of a quote for one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub token_in: usize,
    pub token_out: usize,
    /// Gross input debited from the trader
    pub amount_in: Wad,
    /// Part of the input kept as fee
    pub fee: Wad,
    pub amount_out: Wad,
    pub segments: usize,
    pub crossings: Vec<TickCrossing>,
}

/// A swap that has been routed on a working copy but not yet committed
struct PlannedSwap {
    receipt: SwapReceipt,
    retained: Wad,
    ticks: TickStore,
}

/// An n-token pool of sphere ticks with custody behind a [`TokenLedger`]
#[derive(Debug, Clone)]
pub struct OrbitalPool<L: TokenLedger = InMemoryLedger> {
    settings: PoolSettings,
    geometry: SphereGeometry,
    ticks: TickStore,
    accrued_fees: Vec<Wad>,
    ledger: L,
}

impl OrbitalPool<InMemoryLedger> {
    /// Pool with an empty in-memory ledger
    pub fn in_memory(settings: PoolSettings) -> AmmResult<Self> {
        Self::new(settings, InMemoryLedger::new())
    }
}

impl<L: TokenLedger> OrbitalPool<L> {
    pub fn new(settings: PoolSettings, ledger: L) -> AmmResult<Self> {
        settings
            .validate()
            .map_err(|e| AmmError::InvalidSettings(e.to_string()))?;

        let token_count = settings.token_count();
        let geometry = SphereGeometry::new(token_count)?;
        info!(
            pool = %settings.name,
            tokens = token_count,
            fee_bps = settings.fee_bps,
            "Orbital pool created"
        );

        Ok(Self {
            settings,
            geometry,
            ticks: TickStore::new(token_count),
            accrued_fees: vec![Wad::ZERO; token_count],
            ledger,
        })
    }

    pub fn from_config(config: &PoolConfig, ledger: L) -> AmmResult<Self> {
        Self::new(config.pool.clone(), ledger)
    }

    // ========================================================================
    // Liquidity
    // ========================================================================

    /// Register an empty tick with radius `r` and boundary `k` (0 for none)
    pub fn create_tick(&mut self, r: Wad, k: Wad) -> AmmResult<TickId> {
        let id = LiquidityManager::create_tick(&mut self.ticks, r, k)
            .inspect_err(|e| warn!(error = %e, "Tick creation rejected"))?;
        info!(tick = %id, r = %r, k = %k, "Tick created");
        Ok(id)
    }

    /// Deposit into a tick; returns the shares minted
    #[instrument(skip(self, amounts), fields(pool = %self.settings.name))]
    pub fn add_liquidity(
        &mut self,
        provider: &AccountId,
        tick: TickId,
        amounts: &[Wad],
    ) -> AmmResult<Wad> {
        self.try_add_liquidity(provider, tick, amounts)
            .inspect_err(|e| log_failure(e, "Deposit failed"))
    }

    fn try_add_liquidity(
        &mut self,
        provider: &AccountId,
        tick: TickId,
        amounts: &[Wad],
    ) -> AmmResult<Wad> {
        self.check_amounts(amounts)?;
        let current = self.ticks.current_point()?;
        let plan = LiquidityManager::plan_deposit(
            &self.geometry,
            self.ticks.get(tick)?,
            current.as_ref(),
            provider,
            amounts,
        )?;

        let settlement = plan
            .pulled
            .iter()
            .enumerate()
            .fold(Settlement::new(provider), |s, (token, amount)| {
                s.debit(token, *amount)
            });
        settlement.execute(&mut self.ledger)?;
        self.ticks.replace(plan.tick)?;

        info!(tick = %tick, shares = %plan.shares_minted, "Liquidity added");
        Ok(plan.shares_minted)
    }

    /// Burn shares of a tick; returns the amount of each token paid out
    #[instrument(skip(self), fields(pool = %self.settings.name))]
    pub fn remove_liquidity(
        &mut self,
        provider: &AccountId,
        tick: TickId,
        shares: Wad,
    ) -> AmmResult<Vec<Wad>> {
        self.try_remove_liquidity(provider, tick, shares)
            .inspect_err(|e| log_failure(e, "Withdrawal failed"))
    }

    fn try_remove_liquidity(
        &mut self,
        provider: &AccountId,
        tick: TickId,
        shares: Wad,
    ) -> AmmResult<Vec<Wad>> {
        let plan = LiquidityManager::plan_withdrawal(
            &self.geometry,
            self.ticks.get(tick)?,
            provider,
            shares,
        )?;

        let settlement = plan
            .withdrawn
            .iter()
            .enumerate()
            .fold(Settlement::new(provider), |s, (token, amount)| {
                s.credit(token, *amount)
            });
        settlement.execute(&mut self.ledger)?;
        self.ticks.replace(plan.tick)?;

        info!(tick = %tick, shares = %shares, "Liquidity removed");
        Ok(plan.withdrawn)
    }

    // ========================================================================
    // Trading
    // ========================================================================

    /// Swap `amount_in` of `token_in` for at least `min_amount_out` of
    /// `token_out`
    #[instrument(skip(self), fields(pool = %self.settings.name))]
    pub fn swap(
        &mut self,
        trader: &AccountId,
        token_in: usize,
        amount_in: Wad,
        token_out: usize,
        min_amount_out: Wad,
    ) -> AmmResult<SwapReceipt> {
        self.try_swap(trader, token_in, amount_in, token_out, min_amount_out)
            .inspect_err(|e| log_failure(e, "Swap failed"))
    }

    fn try_swap(
        &mut self,
        trader: &AccountId,
        token_in: usize,
        amount_in: Wad,
        token_out: usize,
        min_amount_out: Wad,
    ) -> AmmResult<SwapReceipt> {
        let planned = self.plan_swap(token_in, amount_in, token_out)?;
        let receipt = planned.receipt;
        if receipt.amount_out < min_amount_out {
            return Err(AmmError::SlippageExceeded {
                amount_out: receipt.amount_out,
                min_amount_out,
            });
        }

        Settlement::new(trader)
            .debit(token_in, amount_in)
            .credit(token_out, receipt.amount_out)
            .execute(&mut self.ledger)?;

        self.ticks = planned.ticks;
        self.accrued_fees[token_in] += planned.retained;

        info!(
            token_in,
            token_out,
            amount_in = %amount_in,
            amount_out = %receipt.amount_out,
            fee = %receipt.fee,
            segments = receipt.segments,
            "Swap executed"
        );
        Ok(receipt)
    }

    /// Price a swap without touching state or the ledger
    pub fn quote_swap(
        &self,
        token_in: usize,
        amount_in: Wad,
        token_out: usize,
    ) -> AmmResult<SwapReceipt> {
        Ok(self.plan_swap(token_in, amount_in, token_out)?.receipt)
    }

    fn plan_swap(
        &self,
        token_in: usize,
        amount_in: Wad,
        token_out: usize,
    ) -> AmmResult<PlannedSwap> {
        self.check_token(token_in)?;
        self.check_token(token_out)?;
        if token_in == token_out {
            return Err(AmmError::SameToken { index: token_in });
        }
        if !amount_in.is_positive() {
            return Err(AmmError::ZeroAmount);
        }

        let fee = mul_div(
            amount_in,
            Wad::from_int(self.settings.fee_bps as i64),
            Wad::from_int(BPS_DENOMINATOR as i64),
        )?;
        let net_in = amount_in - fee;
        if !net_in.is_positive() {
            return Err(AmmError::ZeroAmount);
        }

        let before = self.ticks.global_state()?;
        let mut ticks = self.ticks.clone();
        let outcome = SegmentedRouter::new(&self.geometry, &mut ticks)
            .route(SwapDirection::new(token_in, token_out), net_in)?;
        let after = ticks.global_state()?;

        // pay exactly what left the ticks
        let amount_out = before.total_reserves[token_out] - after.total_reserves[token_out];
        if !amount_out.is_positive() {
            return Err(AmmError::InvalidTrade);
        }

        Ok(PlannedSwap {
            receipt: SwapReceipt {
                token_in,
                token_out,
                amount_in,
                fee,
                amount_out,
                segments: outcome.segments,
                crossings: outcome.crossings,
            },
            retained: fee + outcome.dust,
            ticks,
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn get_tick_info(&self, tick: TickId) -> AmmResult<TickInfo> {
        Ok(self.ticks.get(tick)?.info())
    }

    pub fn get_global_state(&self) -> AmmResult<GlobalState> {
        self.ticks.global_state()
    }

    /// Whether the tick satisfies its sphere invariant and boundary
    /// constraints; ticks without liquidity trivially do
    pub fn check_invariant(&self, tick: TickId) -> AmmResult<bool> {
        match self.ticks.get(tick)?.verify(&self.geometry) {
            Ok(()) => Ok(true),
            Err(AmmError::InvariantViolation { .. }) | Err(AmmError::BoundaryViolation { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Reserves lie on the tick's boundary plane, pinned or not
    pub fn is_on_boundary(&self, tick: TickId) -> AmmResult<bool> {
        self.ticks.get(tick)?.is_on_boundary(&self.geometry)
    }

    pub fn is_pinned(&self, tick: TickId) -> AmmResult<bool> {
        Ok(self.ticks.get(tick)?.pinned)
    }

    /// Marginal price of `token_a` in units of `token_b`, read from the
    /// largest active tick: `(r − x_a) / (r − x_b)`
    pub fn get_price(&self, token_a: usize, token_b: usize) -> AmmResult<Wad> {
        self.check_token(token_a)?;
        self.check_token(token_b)?;
        let tick = self.ticks.largest_active().ok_or(AmmError::NoLiquidity)?;
        Ok(div(
            tick.r - tick.reserves[token_a],
            tick.r - tick.reserves[token_b],
        )?)
    }

    pub fn shares_of(&self, tick: TickId, owner: &AccountId) -> AmmResult<Wad> {
        Ok(self.ticks.get(tick)?.shares_of(owner))
    }

    /// Aggregate as the next swap segment would see it
    pub fn consolidated_state(&self) -> AmmResult<ConsolidatedState> {
        consolidate(&self.geometry, &self.ticks)
    }

    pub fn accrued_fees(&self) -> &[Wad] {
        &self.accrued_fees
    }

    pub fn token_count(&self) -> usize {
        self.geometry.token_count()
    }

    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn geometry(&self) -> &SphereGeometry {
        &self.geometry
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn check_token(&self, index: usize) -> AmmResult<()> {
        if index >= self.token_count() {
            return Err(AmmError::InvalidTokenIndex {
                index,
                token_count: self.token_count(),
            });
        }
        Ok(())
    }

    fn check_amounts(&self, amounts: &[Wad]) -> AmmResult<()> {
        if amounts.len() != self.token_count() {
            return Err(AmmError::LengthMismatch {
                expected: self.token_count(),
                actual: amounts.len(),
            });
        }
        if let Some(token) = amounts.iter().position(|a| a.is_negative()) {
            return Err(AmmError::NegativeAmount { token });
        }
        if amounts.iter().all(|a| a.is_zero()) {
            return Err(AmmError::ZeroAmount);
        }
        Ok(())
    }
}

fn log_failure(error: &AmmError, operation: &str) {
    warn!(
        error = %error,
        category = ?error.category(),
        recoverable = error.is_recoverable(),
        "{}",
        operation
    );
}
