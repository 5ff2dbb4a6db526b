//! Pool trait definitions for a Decimal-facing AMM interface

use crate::consolidation::CurveKind;
use crate::ledger::TokenLedger;
use crate::pool::OrbitalPool;
use anyhow::{Context, Result};
use orbital_types::Wad;
use rust_decimal::Decimal;

/// Read-only pricing interface for integrators that work in Decimal
pub trait AmmPool {
    /// Output for a given input after fees, without executing
    fn get_amount_out(&self, token_in: usize, token_out: usize, amount_in: Decimal)
        -> Result<Decimal>;

    /// Marginal price of `base` in units of `quote`
    fn get_spot_price(&self, base: usize, quote: usize) -> Result<Decimal>;

    /// Total reserves per token across active ticks
    fn get_liquidity(&self) -> Result<Vec<Decimal>>;

    /// Get fee tier
    fn get_fee_bps(&self) -> u32;

    /// Surface the next trade segment would be solved on
    fn curve_kind(&self) -> Result<CurveKind>;
}

impl<L: TokenLedger> AmmPool for OrbitalPool<L> {
    fn get_amount_out(
        &self,
        token_in: usize,
        token_out: usize,
        amount_in: Decimal,
    ) -> Result<Decimal> {
        let amount_in = Wad::from_decimal(amount_in).context("Invalid input amount")?;
        let receipt = self
            .quote_swap(token_in, amount_in, token_out)
            .context("Quote failed")?;
        Ok(receipt.amount_out.to_decimal()?)
    }

    fn get_spot_price(&self, base: usize, quote: usize) -> Result<Decimal> {
        Ok(self.get_price(base, quote)?.to_decimal()?)
    }

    fn get_liquidity(&self) -> Result<Vec<Decimal>> {
        self.get_global_state()?
            .total_reserves
            .into_iter()
            .map(|x| x.to_decimal().context("Reserve out of Decimal range"))
            .collect()
    }

    fn get_fee_bps(&self) -> u32 {
        self.settings().fee_bps
    }

    fn curve_kind(&self) -> Result<CurveKind> {
        Ok(self.consolidated_state()?.curve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_config::PoolSettings;
    use orbital_types::AccountId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_interface() {
        let mut pool =
            OrbitalPool::in_memory(PoolSettings::new("pair", &["X", "Y"], 30)).unwrap();
        let lp = AccountId::from("lp");
        pool.ledger_mut().mint(0, &lp, Wad::from_int(1_000));
        pool.ledger_mut().mint(1, &lp, Wad::from_int(1_000));
        let tick = pool.create_tick(Wad::ONE, Wad::ZERO).unwrap();
        pool.add_liquidity(&lp, tick, &[Wad::from_int(1_000); 2])
            .unwrap();

        assert_eq!(pool.get_fee_bps(), 30);
        assert_eq!(pool.get_spot_price(0, 1).unwrap(), dec!(1));
        assert_eq!(pool.get_liquidity().unwrap(), vec![dec!(1000), dec!(1000)]);
        assert_eq!(pool.curve_kind().unwrap(), CurveKind::Sphere);

        let out = pool.get_amount_out(0, 1, dec!(10)).unwrap();
        assert!(out > dec!(9) && out < dec!(10), "{}", out);
        assert!(pool.get_amount_out(0, 0, dec!(10)).is_err());
    }
}
