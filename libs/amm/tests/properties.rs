//! Pool Property Tests
//!
//! Properties that must hold for any sequence of swaps on any pool shape:
//! committed swaps keep every tick on its sphere and within its boundary,
//! tokens are conserved, and a failed swap is a geometric rejection that leaves
//! no trace. Interior ticks stay parallel and larger inputs buy strictly
//! more.

use orbital_amm::{ErrorCategory, OrbitalPool, TickInfo};
use orbital_config::PoolSettings;
use orbital_types::fixed_point::{div, mul};
use orbital_types::{AccountId, TickId, Wad};
use proptest::prelude::*;

const FUNDING: i64 = 10_000_000;

/// Rounding slack when comparing tick-level reserve totals with amounts
const CONSERVATION_TOLERANCE: Wad = Wad::from_raw(1_000_000_000);

#[derive(Debug, Clone)]
struct TickSpec {
    reserve: i64,
    /// Extra `k/r` above the equal-price point, in percent; `None` for no boundary
    boundary_margin_pct: Option<i64>,
}

#[derive(Debug, Clone)]
struct SwapSpec {
    token_in: usize,
    token_out: usize,
    amount: i64,
}

prop_compose! {
    fn tick_spec()
        (reserve in 1_000i64..20_000, margin in prop::option::of(2i64..30)) -> TickSpec {
        TickSpec { reserve, boundary_margin_pct: margin }
    }
}

prop_compose! {
    fn swap_spec(token_count: usize)
        (token_in in 0..token_count, shift in 1..token_count, amount in 1i64..6_000) -> SwapSpec {
        SwapSpec {
            token_in,
            token_out: (token_in + shift) % token_count,
            amount,
        }
    }
}

fn pool_case() -> impl Strategy<Value = (usize, u32, Vec<TickSpec>, Vec<SwapSpec>)> {
    (2usize..=4, 0u32..50).prop_flat_map(|(token_count, fee_bps)| {
        (
            Just(token_count),
            Just(fee_bps),
            prop::collection::vec(tick_spec(), 1..4),
            prop::collection::vec(swap_spec(token_count), 1..10),
        )
    })
}

fn build_pool(token_count: usize, fee_bps: u32, ticks: &[TickSpec]) -> OrbitalPool {
    let symbols: Vec<String> = (0..token_count).map(|i| format!("T{}", i)).collect();
    let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let mut pool = OrbitalPool::in_memory(PoolSettings::new("prop", &symbols, fee_bps)).unwrap();

    let lp = AccountId::from("lp");
    let trader = AccountId::from("trader");
    for token in 0..token_count {
        pool.ledger_mut().mint(token, &lp, Wad::from_int(FUNDING));
        pool.ledger_mut().mint(token, &trader, Wad::from_int(FUNDING));
    }

    let equal_price_norm = pool.geometry().sqrt_n() - Wad::ONE;
    for spec in ticks {
        // created at r = 1 so the first deposit rescales k to exactly k/r
        let k = match spec.boundary_margin_pct {
            Some(pct) => equal_price_norm + Wad::from_ratio(pct, 100).unwrap(),
            None => Wad::ZERO,
        };
        let tick = pool.create_tick(Wad::ONE, k).unwrap();
        pool.add_liquidity(&lp, tick, &vec![Wad::from_int(spec.reserve); token_count])
            .unwrap();
    }
    pool
}

fn snapshot(pool: &OrbitalPool) -> Vec<TickInfo> {
    (0..pool.tick_count())
        .map(|i| pool.get_tick_info(TickId::new(i as u64)).unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn swaps_preserve_invariants_and_conserve_tokens(
        (token_count, fee_bps, ticks, swaps) in pool_case()
    ) {
        let mut pool = build_pool(token_count, fee_bps, &ticks);
        let trader = AccountId::from("trader");

        for swap in &swaps {
            let before = pool.get_global_state().unwrap();
            let ticks_before = snapshot(&pool);
            let fees_before = pool.accrued_fees().to_vec();
            let balance_in = pool.ledger().balance_of(swap.token_in, &trader);
            let amount_in = Wad::from_int(swap.amount);

            match pool.swap(&trader, swap.token_in, amount_in, swap.token_out, Wad::ZERO) {
                Ok(receipt) => {
                    let after = pool.get_global_state().unwrap();
                    prop_assert!(receipt.amount_out.is_positive());
                    prop_assert_eq!(
                        before.total_reserves[swap.token_out] - after.total_reserves[swap.token_out],
                        receipt.amount_out
                    );

                    let retained = pool.accrued_fees()[swap.token_in] - fees_before[swap.token_in];
                    let gained = after.total_reserves[swap.token_in]
                        - before.total_reserves[swap.token_in];
                    prop_assert!(retained >= receipt.fee);
                    prop_assert!((gained + retained - amount_in).abs() < CONSERVATION_TOLERANCE);

                    prop_assert_eq!(
                        pool.ledger().balance_of(swap.token_in, &trader),
                        balance_in - amount_in
                    );
                    for i in 0..pool.tick_count() {
                        prop_assert!(pool.check_invariant(TickId::new(i as u64)).unwrap());
                    }
                }
                Err(err) => {
                    prop_assert_eq!(
                        err.category(),
                        ErrorCategory::GeometryInfeasible,
                        "{}",
                        err
                    );
                    prop_assert_eq!(snapshot(&pool), ticks_before);
                    prop_assert_eq!(pool.accrued_fees(), &fees_before[..]);
                    prop_assert_eq!(pool.ledger().balance_of(swap.token_in, &trader), balance_in);
                }
            }
        }
    }

    #[test]
    fn quote_predicts_swap(
        (token_count, fee_bps, ticks, swaps) in pool_case()
    ) {
        let mut pool = build_pool(token_count, fee_bps, &ticks);
        let trader = AccountId::from("trader");

        for swap in &swaps {
            let amount_in = Wad::from_int(swap.amount);
            let quote = pool.quote_swap(swap.token_in, amount_in, swap.token_out);
            let executed = pool.swap(&trader, swap.token_in, amount_in, swap.token_out, Wad::ZERO);
            prop_assert_eq!(quote, executed);
        }
    }

    #[test]
    fn balanced_deposit_round_trips(
        token_count in 2usize..=5,
        reserve in 1i64..1_000_000,
    ) {
        let symbols: Vec<String> = (0..token_count).map(|i| format!("T{}", i)).collect();
        let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
        let mut pool = OrbitalPool::in_memory(PoolSettings::new("rt", &symbols, 0)).unwrap();
        let lp = AccountId::from("lp");
        for token in 0..token_count {
            pool.ledger_mut().mint(token, &lp, Wad::from_int(reserve));
        }

        let amounts = vec![Wad::from_int(reserve); token_count];
        let tick = pool.create_tick(Wad::ONE, Wad::ZERO).unwrap();
        let shares = pool.add_liquidity(&lp, tick, &amounts).unwrap();
        prop_assert!(shares.is_positive());

        let returned = pool.remove_liquidity(&lp, tick, shares).unwrap();
        prop_assert_eq!(returned, amounts);
        for token in 0..token_count {
            prop_assert_eq!(pool.ledger().balance_of(token, &lp), Wad::from_int(reserve));
        }
    }

    #[test]
    fn second_provider_gets_proportional_claim(
        reserve in 100i64..50_000,
        ratio_pct in 1i64..300,
    ) {
        let mut pool =
            OrbitalPool::in_memory(PoolSettings::new("pro", &["A", "B", "C"], 0)).unwrap();
        let first = AccountId::from("first");
        let second = AccountId::from("second");
        for token in 0..3 {
            pool.ledger_mut().mint(token, &first, Wad::from_int(FUNDING));
            pool.ledger_mut().mint(token, &second, Wad::from_int(FUNDING));
        }

        let tick = pool.create_tick(Wad::ONE, Wad::ZERO).unwrap();
        let base = pool.add_liquidity(&first, tick, &[Wad::from_int(reserve); 3]).unwrap();

        let ratio = Wad::from_ratio(ratio_pct, 100).unwrap();
        let offered = mul(Wad::from_int(reserve), ratio).unwrap();
        let minted = pool.add_liquidity(&second, tick, &[offered; 3]).unwrap();
        prop_assert!((minted - mul(base, ratio).unwrap()).abs() < CONSERVATION_TOLERANCE);

        let paid = pool.remove_liquidity(&second, tick, minted).unwrap();
        for out in paid {
            prop_assert!((out - offered).abs() < CONSERVATION_TOLERANCE);
        }
        prop_assert!(pool.check_invariant(tick).unwrap());
    }

    #[test]
    fn interior_ticks_stay_parallel(
        reserves in prop::collection::vec(1_000i64..20_000, 2..4),
        swaps in prop::collection::vec(swap_spec(3), 1..8),
    ) {
        let ticks: Vec<TickSpec> = reserves
            .iter()
            .map(|&reserve| TickSpec { reserve, boundary_margin_pct: None })
            .collect();
        let mut pool = build_pool(3, 0, &ticks);
        let trader = AccountId::from("trader");

        for swap in &swaps {
            let _ = pool.swap(
                &trader,
                swap.token_in,
                Wad::from_int(swap.amount),
                swap.token_out,
                Wad::ZERO,
            );
        }

        let infos = snapshot(&pool);
        let reference = &infos[0];
        for info in &infos[1..] {
            for token in 0..3 {
                let a = div(reference.reserves[token], reference.r).unwrap();
                let b = div(info.reserves[token], info.r).unwrap();
                prop_assert!((a - b).abs() < CONSERVATION_TOLERANCE);
            }
        }
    }

    #[test]
    fn larger_input_buys_more(
        (token_count, fee_bps, ticks, swaps) in pool_case()
    ) {
        let pool = build_pool(token_count, fee_bps, &ticks);
        let swap = &swaps[0];
        let small = pool.quote_swap(swap.token_in, Wad::from_int(swap.amount), swap.token_out);
        let large = pool.quote_swap(swap.token_in, Wad::from_int(2 * swap.amount), swap.token_out);
        if let (Ok(small), Ok(large)) = (small, large) {
            prop_assert!(large.amount_out > small.amount_out);
        }
    }

    #[test]
    fn excess_deposit_is_not_pulled(
        reserve in 100i64..50_000,
        extra in 1i64..10_000,
    ) {
        let mut pool =
            OrbitalPool::in_memory(PoolSettings::new("ex", &["A", "B", "C"], 0)).unwrap();
        let first = AccountId::from("first");
        let second = AccountId::from("second");
        for token in 0..3 {
            pool.ledger_mut().mint(token, &first, Wad::from_int(FUNDING));
            pool.ledger_mut().mint(token, &second, Wad::from_int(FUNDING));
        }

        let tick = pool.create_tick(Wad::ONE, Wad::ZERO).unwrap();
        pool.add_liquidity(&first, tick, &[Wad::from_int(reserve); 3]).unwrap();

        let offered = [
            Wad::from_int(reserve),
            Wad::from_int(reserve + extra),
            Wad::from_int(reserve),
        ];
        pool.add_liquidity(&second, tick, &offered).unwrap();

        for token in 0..3 {
            let pulled = Wad::from_int(FUNDING) - pool.ledger().balance_of(token, &second);
            prop_assert!((pulled - Wad::from_int(reserve)).abs() < CONSERVATION_TOLERANCE);
        }
        prop_assert!(pool.check_invariant(tick).unwrap());
    }
}
