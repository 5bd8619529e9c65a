//! Constant-product swap execution.
//!
//! A swap is computed in two phases so every check precedes the first
//! state write:
//!
//! 1. [`plan_swap`] validates the request and computes the full effect
//!    (reserve deltas, fee accrual, referral payout) against current
//!    reserves, without mutating anything. This is also the read-only
//!    expected-output projection used by the route planner: it runs the
//!    exact arithmetic of the live swap.
//! 2. [`commit_swap`] applies a plan to the ledger.
//!
//! [`swap`] composes both with the custody collaborator: pull the input,
//! commit reserves and fee buckets, then pay out recipient and referral.
//!
//! # Fee rules
//!
//! - The base fee applies only when the anchor asset is the input side;
//!   the effective input is clamped to 1 so a fee-rounded-to-zero input
//!   cannot produce a zero-effect swap.
//! - The slippage fee claws back a share of slippage beyond a baseline
//!   (both system parameters, off by default) and leaves it in the
//!   output reserve for liquidity providers.
//! - Referral is always denominated in the anchor asset: paid out of the
//!   base fee when the anchor is the input, deducted from the trader's
//!   output when the anchor is the output.

use lib_types::{Account, Amount, AssetId, Bps, PoolId};

use crate::errors::{AmmError, AmmResult};
use crate::custody::AssetCustody;
use crate::math::{deduct_bps, take_bps};
use crate::state::{DexState, Direction};

/// Referral bounds enforced at the engine layer
pub const MIN_REF_BPS: Bps = 1;
pub const MAX_REF_BPS: Bps = 1_000;

/// Referral payout request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    pub beneficiary: Account,
    pub ref_bps: Bps,
}

/// Fully-validated effect of a swap against a specific reserve snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub pool_id: PoolId,
    pub direction: Direction,
    pub amount_in: Amount,
    /// Input credited to the reserve after the base fee, clamped to >= 1
    pub effective_in: Amount,
    /// `amount_in - effective_in`; zero unless the anchor is the input
    pub base_fee: Amount,
    /// Slippage-fee amount retained in the output reserve
    pub slip_fee: Amount,
    /// Total leaving the output reserve (recipient + reserve-funded referral)
    pub out_total: Amount,
    /// Paid to the referral beneficiary, in the anchor asset
    pub referral_out: Amount,
    /// Paid to the recipient
    pub user_out: Amount,
    /// Base fee accrued to the anchor-side fee bucket (net of referral)
    pub fee_to_bucket: Amount,
    pub new_reserve_in: Amount,
    pub new_reserve_out: Amount,
    /// Whether the anchor asset is the input side (decides fee accrual)
    pub anchor_is_input: bool,
}

impl SwapPlan {
    /// Base fee plus slippage fee
    pub fn total_fee(&self) -> Amount {
        self.base_fee + self.slip_fee
    }
}

/// Outcome of a committed swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub pool_id: PoolId,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub referral_out: Amount,
    pub fee: Amount,
}

/// Validate a swap and compute its exact effect. Read-only.
pub fn plan_swap(
    state: &DexState,
    pool_id: PoolId,
    direction: Direction,
    amount_in: Amount,
    min_amount_out: Amount,
    referral_bps: Option<Bps>,
) -> AmmResult<SwapPlan> {
    if amount_in == 0 {
        return Err(AmmError::ZeroAmount);
    }

    let pool = state.pool(pool_id).ok_or(AmmError::PoolNotFound(pool_id))?;
    if !pool.has_liquidity() {
        return Err(AmmError::ZeroReserves(pool_id));
    }

    let (reserve_in, reserve_out) = pool.reserves(direction);
    let (asset_in, asset_out) = pool.assets(direction);
    let anchor = &state.params.anchor_asset;
    let anchor_is_input = asset_in == anchor;
    let anchor_is_output = asset_out == anchor;

    // Pool drain protection: a single swap may not consume more than half
    // of the input reserve.
    if (amount_in as u128) * 2 > reserve_in as u128 {
        return Err(AmmError::DrainProtection {
            amount_in,
            reserve_in,
        });
    }

    if let Some(bps) = referral_bps {
        if !(MIN_REF_BPS..=MAX_REF_BPS).contains(&bps) {
            return Err(AmmError::RefBpsOutOfRange(bps));
        }
        if !anchor_is_input && !anchor_is_output {
            return Err(AmmError::ReferralRequiresAnchor);
        }
    }

    // Base fee applies only on anchor-asset input.
    let mut effective_in = if anchor_is_input && pool.fee_bps > 0 {
        deduct_bps(amount_in, pool.fee_bps)
    } else {
        amount_in
    };
    if effective_in == 0 {
        effective_in = 1;
    }
    let base_fee = amount_in - effective_in;

    // Constant product: out = reserve_out - k / (reserve_in + effective_in).
    let k = (reserve_in as u128) * (reserve_out as u128);
    let new_reserve_in = reserve_in
        .checked_add(effective_in)
        .ok_or(AmmError::OutOfBounds)?;
    let retained = k / (new_reserve_in as u128);
    let amount_out = reserve_out - (retained as Amount);
    if amount_out == 0 || amount_out >= reserve_out {
        return Err(AmmError::OutputOutOfRange {
            amount_out,
            reserve_out,
        });
    }

    // Slippage fee: claw back a share of slippage beyond the baseline and
    // keep it in the output reserve.
    let mut out_total = amount_out;
    let mut slip_fee = 0;
    if state.params.slip_share_bps > 0 {
        let nominal = ((reserve_out as u128) * (effective_in as u128) / (reserve_in as u128)) as Amount;
        if nominal > 0 {
            let slip_bps = (nominal.saturating_sub(amount_out) as u128) * 10_000 / (nominal as u128);
            let baseline = state.params.slip_baseline_bps as u128;
            if slip_bps > baseline {
                let excess = slip_bps - baseline;
                let mut extra = ((amount_out as u128) * excess * (state.params.slip_share_bps as u128)
                    / 10_000
                    / 10_000) as Amount;
                if extra >= out_total {
                    extra = out_total - 1;
                }
                out_total -= extra;
                slip_fee = extra;
            }
        }
    }

    // Referral payout, always in the anchor asset.
    let mut referral_out = 0;
    let mut user_out = out_total;
    let mut fee_to_bucket = base_fee;
    if let Some(bps) = referral_bps {
        if anchor_is_input {
            // paid out of the base fee; the trader's output is untouched
            referral_out = take_bps(base_fee, bps);
            fee_to_bucket = base_fee - referral_out;
        } else {
            // deducted from the trader's output
            referral_out = take_bps(out_total, bps);
            if referral_out >= out_total {
                referral_out = out_total - 1;
            }
            user_out = out_total - referral_out;
        }
    }

    if user_out < min_amount_out {
        return Err(AmmError::SlippageExceeded {
            amount_out: user_out,
            min_out: min_amount_out,
        });
    }

    Ok(SwapPlan {
        pool_id,
        direction,
        amount_in,
        effective_in,
        base_fee,
        slip_fee,
        out_total,
        referral_out,
        user_out,
        fee_to_bucket,
        new_reserve_in,
        new_reserve_out: reserve_out - out_total,
        anchor_is_input,
    })
}

/// Apply a plan's reserve and fee-bucket writes to the ledger.
///
/// The plan must have been computed against the current reserves; callers
/// that interleave other mutations between plan and commit corrupt the
/// constant-product invariant.
pub fn commit_swap(state: &mut DexState, plan: &SwapPlan) -> AmmResult<()> {
    let anchor_is_input = plan.anchor_is_input;
    let pool = state
        .pool_mut(plan.pool_id)
        .ok_or(AmmError::PoolNotFound(plan.pool_id))?;

    match plan.direction {
        Direction::ZeroToOne => {
            pool.reserve0 = plan.new_reserve_in;
            pool.reserve1 = plan.new_reserve_out;
            if anchor_is_input && plan.fee_to_bucket > 0 {
                pool.fee_bucket0 = pool
                    .fee_bucket0
                    .checked_add(plan.fee_to_bucket)
                    .ok_or(AmmError::OutOfBounds)?;
            }
        }
        Direction::OneToZero => {
            pool.reserve1 = plan.new_reserve_in;
            pool.reserve0 = plan.new_reserve_out;
            if anchor_is_input && plan.fee_to_bucket > 0 {
                pool.fee_bucket1 = pool
                    .fee_bucket1
                    .checked_add(plan.fee_to_bucket)
                    .ok_or(AmmError::OutOfBounds)?;
            }
        }
    }
    Ok(())
}

/// Execute a single-pool swap end to end.
///
/// Custody order: pull the input first, commit the ledger, then pay out.
/// Any validation failure happens before the pull, so a rejected swap
/// leaves both the ledger and custody untouched.
pub fn swap(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    sender: &Account,
    recipient: &Account,
    pool_id: PoolId,
    direction: Direction,
    amount_in: Amount,
    min_amount_out: Amount,
    referral: Option<&Referral>,
) -> AmmResult<SwapOutcome> {
    let plan = plan_swap(
        state,
        pool_id,
        direction,
        amount_in,
        min_amount_out,
        referral.map(|r| r.ref_bps),
    )?;

    let (asset_in, asset_out) = {
        let pool = state.pool(pool_id).ok_or(AmmError::PoolNotFound(pool_id))?;
        let (a_in, a_out) = pool.assets(direction);
        (a_in.clone(), a_out.clone())
    };

    custody.draw(sender, &asset_in, amount_in)?;
    commit_swap(state, &plan)?;

    if plan.referral_out > 0 {
        let referral = referral.ok_or_else(|| {
            AmmError::Invariant("referral payout planned without a beneficiary".to_string())
        })?;
        let anchor = state.params.anchor_asset.clone();
        custody.transfer(&referral.beneficiary, &anchor, plan.referral_out)?;
    }
    custody.transfer(recipient, &asset_out, plan.user_out)?;

    Ok(SwapOutcome {
        pool_id,
        asset_in,
        asset_out,
        amount_in,
        amount_out: plan.user_out,
        referral_out: plan.referral_out,
        fee: plan.total_fee(),
    })
}

/// Read-only expected output for a prospective swap.
///
/// Mirrors [`plan_swap`] exactly (same arithmetic, same fee rules) so the
/// projection cannot diverge from live execution.
pub fn quote(
    state: &DexState,
    pool_id: PoolId,
    direction: Direction,
    amount_in: Amount,
    referral_bps: Option<Bps>,
) -> AmmResult<(Amount, Amount)> {
    let plan = plan_swap(state, pool_id, direction, amount_in, 0, referral_bps)?;
    Ok((plan.user_out, plan.total_fee()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::MemoryCustody;
    use crate::liquidity::{add_liquidity, create_pool};
    use crate::state::DexParams;

    const ALICE: &str = "ledger:alice";
    const BOB: &str = "ledger:bob";
    const REF: &str = "ledger:referrer";

    /// USD/BTC pool with reserves (2_000_000, 1_000_000) and 8 bps fee
    fn setup() -> (DexState, MemoryCustody, PoolId) {
        let mut state = DexState::new(DexParams::default());
        let custody = MemoryCustody::new();
        custody.set_balance(ALICE, "USD", 10_000_000);
        custody.set_balance(ALICE, "BTC", 10_000_000);
        custody.set_balance(BOB, "USD", 10_000_000);
        custody.set_balance(BOB, "BTC", 10_000_000);

        let pool_id = create_pool(&mut state, "USD".into(), "BTC".into(), None).unwrap();
        add_liquidity(
            &mut state,
            &custody,
            pool_id,
            2_000_000,
            1_000_000,
            &Account::new(ALICE),
        )
        .unwrap();
        (state, custody, pool_id)
    }

    fn k_of(state: &DexState, pool_id: PoolId) -> u128 {
        let pool = state.pool(pool_id).unwrap();
        (pool.reserve0 as u128) * (pool.reserve1 as u128)
    }

    /// Golden vector: 100k anchor input against (2M, 1M) at 8 bps
    #[test]
    fn golden_anchor_input_swap() {
        let (mut state, custody, pool_id) = setup();
        let outcome = swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            100_000,
            0,
            None,
        )
        .unwrap();

        // effective in = 100_000 * 9992 / 10000 = 99_920
        // out = 1_000_000 - floor(2e12 / 2_099_920) = 47_583
        assert_eq!(outcome.amount_out, 47_583);
        assert!(outcome.amount_out >= 47_500 && outcome.amount_out <= 47_700);
        assert_eq!(outcome.fee, 80);

        let pool = state.pool(pool_id).unwrap();
        assert_eq!(pool.reserve0, 2_099_920);
        assert_eq!(pool.reserve1, 1_000_000 - 47_583);
        assert_eq!(pool.fee_bucket0, 80);
        assert_eq!(pool.fee_bucket1, 0);
        assert_eq!(custody.balance(&Account::new(BOB), &"BTC".into()), 10_000_000 + 47_583);
    }

    #[test]
    fn test_non_anchor_input_has_no_base_fee() {
        let (mut state, custody, pool_id) = setup();
        let outcome = swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::OneToZero,
            100_000,
            0,
            None,
        )
        .unwrap();

        // full input credited: out = 2_000_000 - floor(2e12 / 1_100_000)
        assert_eq!(outcome.amount_out, 2_000_000 - 1_818_181);
        assert_eq!(outcome.fee, 0);
        let pool = state.pool(pool_id).unwrap();
        assert_eq!(pool.fee_bucket0, 0);
        assert_eq!(pool.fee_bucket1, 0);
    }

    #[test]
    fn invariant_product_never_decreases() {
        let (mut state, custody, pool_id) = setup();
        for (direction, amount) in [
            (Direction::ZeroToOne, 50_000),
            (Direction::OneToZero, 120_000),
            (Direction::ZeroToOne, 999),
            (Direction::OneToZero, 1),
        ] {
            let k_before = k_of(&state, pool_id);
            swap(
                &mut state,
                &custody,
                &Account::new(BOB),
                &Account::new(BOB),
                pool_id,
                direction,
                amount,
                0,
                None,
            )
            .unwrap();
            assert!(k_of(&state, pool_id) >= k_before);
        }
    }

    #[test]
    fn test_drain_protection() {
        let (mut state, custody, pool_id) = setup();
        // 50% of the USD reserve is allowed, one unit more is not
        let err = swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            1_000_001,
            0,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AmmError::DrainProtection { .. }));

        swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            1_000_000,
            0,
            None,
        )
        .unwrap();
    }

    #[test]
    fn test_rejected_swap_leaves_no_trace() {
        let (mut state, custody, pool_id) = setup();
        let snapshot = state.pool(pool_id).unwrap().clone();
        let usd_before = custody.balance(&Account::new(BOB), &"USD".into());

        let err = swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            100_000,
            u64::MAX, // unsatisfiable minimum
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AmmError::SlippageExceeded { .. }));
        assert_eq!(state.pool(pool_id).unwrap(), &snapshot);
        assert_eq!(custody.balance(&Account::new(BOB), &"USD".into()), usd_before);
    }

    #[test]
    fn boundary_effective_in_clamps_to_one() {
        let (mut state, custody, pool_id) = setup();
        // 1 unit of anchor input rounds to zero after the fee; clamped to 1
        let plan = plan_swap(&state, pool_id, Direction::ZeroToOne, 1, 0, None).unwrap();
        assert_eq!(plan.effective_in, 1);
        assert!(plan.user_out > 0);
        let reserve_out = state.pool(pool_id).unwrap().reserve1;
        assert!(plan.user_out < reserve_out);

        swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            1,
            0,
            None,
        )
        .unwrap();
    }

    #[test]
    fn test_referral_bounds() {
        let (state, _custody, pool_id) = setup();
        for bps in [0, 1_001, 10_000] {
            let err =
                plan_swap(&state, pool_id, Direction::ZeroToOne, 100_000, 0, Some(bps)).unwrap_err();
            assert_eq!(err, AmmError::RefBpsOutOfRange(bps));
        }
        for bps in [1, 1_000] {
            plan_swap(&state, pool_id, Direction::ZeroToOne, 100_000, 0, Some(bps)).unwrap();
        }
    }

    #[test]
    fn test_referral_from_base_fee_on_anchor_input() {
        let (mut state, custody, pool_id) = setup();
        let outcome = swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            100_000,
            0,
            Some(&Referral {
                beneficiary: Account::new(REF),
                ref_bps: 1_000,
            }),
        )
        .unwrap();

        // base fee 80, 10% referral = 8, bucket keeps 72
        assert_eq!(outcome.amount_out, 47_583); // output untouched
        assert_eq!(outcome.referral_out, 8);
        assert_eq!(state.pool(pool_id).unwrap().fee_bucket0, 72);
        assert_eq!(custody.balance(&Account::new(REF), &"USD".into()), 8);
    }

    #[test]
    fn test_referral_from_output_on_anchor_output() {
        let (mut state, custody, pool_id) = setup();
        let reserve0_before = state.pool(pool_id).unwrap().reserve0;
        let outcome = swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::OneToZero,
            100_000,
            0,
            Some(&Referral {
                beneficiary: Account::new(REF),
                ref_bps: 100,
            }),
        )
        .unwrap();

        let out_total = 2_000_000 - 1_818_181;
        let referral = out_total / 100;
        assert_eq!(outcome.referral_out, referral);
        assert_eq!(outcome.amount_out, out_total - referral);
        // the full total (trader + referral) left the anchor reserve
        assert_eq!(
            state.pool(pool_id).unwrap().reserve0,
            reserve0_before - out_total
        );
        assert_eq!(custody.balance(&Account::new(REF), &"USD".into()), referral);
    }

    #[test]
    fn test_referral_requires_anchor_in_pair() {
        let mut state = DexState::new(DexParams::default());
        let custody = MemoryCustody::new();
        custody.set_balance(ALICE, "BTC", 10_000_000);
        custody.set_balance(ALICE, "ETH", 10_000_000);
        let pool_id = create_pool(&mut state, "BTC".into(), "ETH".into(), None).unwrap();
        add_liquidity(
            &mut state,
            &custody,
            pool_id,
            1_000_000,
            1_000_000,
            &Account::new(ALICE),
        )
        .unwrap();

        let err =
            plan_swap(&state, pool_id, Direction::ZeroToOne, 10_000, 0, Some(100)).unwrap_err();
        assert_eq!(err, AmmError::ReferralRequiresAnchor);
    }

    #[test]
    fn test_slippage_fee_reduces_output_and_stays_in_reserve() {
        let (mut state, custody, pool_id) = setup();
        state.params.slip_baseline_bps = 0;
        state.params.slip_share_bps = 10_000; // full clawback of excess slippage

        let plan_without = {
            let mut clean = state.clone();
            clean.params.slip_share_bps = 0;
            plan_swap(&clean, pool_id, Direction::ZeroToOne, 500_000, 0, None).unwrap()
        };
        let plan = plan_swap(&state, pool_id, Direction::ZeroToOne, 500_000, 0, None).unwrap();

        assert!(plan.slip_fee > 0);
        assert_eq!(plan.user_out + plan.slip_fee, plan_without.user_out);
        // the clawback stays in the output reserve
        assert_eq!(
            plan.new_reserve_out,
            plan_without.new_reserve_out + plan.slip_fee
        );

        let k_before = k_of(&state, pool_id);
        swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            500_000,
            0,
            None,
        )
        .unwrap();
        assert!(k_of(&state, pool_id) >= k_before);
    }

    #[test]
    fn test_quote_matches_execution() {
        let (mut state, custody, pool_id) = setup();
        let (expected, fee) = quote(&state, pool_id, Direction::ZeroToOne, 250_000, None).unwrap();
        let outcome = swap(
            &mut state,
            &custody,
            &Account::new(BOB),
            &Account::new(BOB),
            pool_id,
            Direction::ZeroToOne,
            250_000,
            expected, // the projection is an exact floor
            None,
        )
        .unwrap();
        assert_eq!(outcome.amount_out, expected);
        assert_eq!(outcome.fee, fee);
    }

    #[test]
    fn determinism_swap_outcome() {
        let run = || {
            let (mut state, custody, pool_id) = setup();
            swap(
                &mut state,
                &custody,
                &Account::new(BOB),
                &Account::new(BOB),
                pool_id,
                Direction::ZeroToOne,
                123_456,
                0,
                None,
            )
            .unwrap()
            .amount_out
        };
        let first = run();
        for _ in 0..5 {
            assert_eq!(run(), first);
        }
    }
}
