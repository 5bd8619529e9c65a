//! Route planning and execution.
//!
//! Resolves a path from `asset_in` to `asset_out`: a direct pool when one
//! exists, otherwise two hops through the anchor (bridge) asset. Business
//! failures (no pool, slippage, drain) come back as a structured
//! [`SwapResult`] with `success == false`; only custody faults and
//! invariant violations propagate as errors.
//!
//! Two-hop routes are atomic: both legs are fully planned against current
//! reserves before the first write, so a failing second leg rejects the
//! whole route with no state change.

use serde::{Deserialize, Serialize};

use lib_types::{Account, Amount, AssetId, Bps, PoolId, MAX_BPS};

use crate::custody::AssetCustody;
use crate::errors::{AmmError, AmmResult};
use crate::math::deduct_bps;
use crate::state::DexState;
use crate::swap::{commit_swap, plan_swap, Referral, SwapPlan};

/// One executed (or projected) hop of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHop {
    pub pool_id: PoolId,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub fee: Amount,
}

/// Outcome of a route attempt.
///
/// Always carries `success` so callers never infer failure from absent
/// fields. On two-hop routes `intermediate_amount` reports the bridge
/// asset amount between the legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub success: bool,
    pub amount_out: Amount,
    pub fee: Amount,
    pub route: Vec<RouteHop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SwapResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            amount_out: 0,
            fee: 0,
            route: Vec::new(),
            intermediate_amount: None,
            error: Some(message.into()),
        }
    }
}

/// A validated route request
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: Amount,
    /// Hard floor on the final output, regardless of computed bounds
    pub min_amount_out: Amount,
    /// Tolerance used to derive per-leg minimum outputs
    pub slippage_bps: Bps,
    /// Fraction of the tolerance (in bps) allocated to the first leg of a
    /// two-hop route; 0 leaves the first leg floored at zero
    pub middle_out_ratio_bps: Bps,
    pub sender: Account,
    pub recipient: Account,
    pub referral: Option<Referral>,
}

/// Execute a route against the ledger.
///
/// Returns `Ok` with a failure-flagged result for expected business
/// conditions; `Err` only for custody faults and invariant violations,
/// which callers must treat as fatal for the instruction.
pub fn execute_route(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    req: &RouteRequest,
) -> AmmResult<SwapResult> {
    if req.asset_in == req.asset_out {
        return Ok(SwapResult::failure("cannot swap asset to itself"));
    }
    if req.slippage_bps > MAX_BPS {
        return Ok(SwapResult::failure("slippage bps out of range"));
    }
    if req.middle_out_ratio_bps > MAX_BPS {
        return Ok(SwapResult::failure("middle out ratio out of range"));
    }

    if let Some(pool) = state.find_pool(&req.asset_in, &req.asset_out) {
        let pool_id = pool.id;
        return execute_direct(state, custody, req, pool_id);
    }

    let anchor = state.params.anchor_asset.clone();
    if req.asset_in != anchor && req.asset_out != anchor {
        return execute_two_hop(state, custody, req, &anchor);
    }

    Ok(SwapResult::failure("no suitable pool found"))
}

fn execute_direct(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    req: &RouteRequest,
    pool_id: PoolId,
) -> AmmResult<SwapResult> {
    let direction = match state
        .pool(pool_id)
        .and_then(|p| p.direction_for(&req.asset_in))
    {
        Some(d) => d,
        None => return Ok(SwapResult::failure("invalid asset pair for pool")),
    };
    let ref_bps = req.referral.as_ref().map(|r| r.ref_bps);

    // Project the expected output, then floor it by the slippage tolerance
    // and the caller's hard minimum.
    let expected = match plan_swap(state, pool_id, direction, req.amount_in, 0, ref_bps) {
        Ok(plan) => plan,
        Err(err) => return business_failure(err),
    };
    let computed_min = deduct_bps(expected.user_out, req.slippage_bps);
    let min_out = req.min_amount_out.max(computed_min);

    let plan = match plan_swap(state, pool_id, direction, req.amount_in, min_out, ref_bps) {
        Ok(plan) => plan,
        Err(err) => return business_failure(err),
    };

    custody.draw(&req.sender, &req.asset_in, req.amount_in)?;
    commit_swap(state, &plan)?;
    settle_payouts(state, custody, req, &plan)?;

    Ok(SwapResult {
        success: true,
        amount_out: plan.user_out,
        fee: plan.total_fee(),
        route: vec![hop(req.asset_in.clone(), req.asset_out.clone(), &plan)],
        intermediate_amount: None,
        error: None,
    })
}

fn execute_two_hop(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    req: &RouteRequest,
    anchor: &AssetId,
) -> AmmResult<SwapResult> {
    let (pool1_id, dir1) = match state.find_pool(&req.asset_in, anchor) {
        Some(pool) => match pool.direction_for(&req.asset_in) {
            Some(d) => (pool.id, d),
            None => return Ok(SwapResult::failure("invalid asset pair for pool")),
        },
        None => return Ok(SwapResult::failure("no pool found for first hop")),
    };
    let (pool2_id, dir2) = match state.find_pool(anchor, &req.asset_out) {
        Some(pool) => match pool.direction_for(anchor) {
            Some(d) => (pool.id, d),
            None => return Ok(SwapResult::failure("invalid asset pair for pool")),
        },
        None => return Ok(SwapResult::failure("no pool found for second hop")),
    };

    // Referral rides the second leg: the anchor is that leg's input, so the
    // payout comes out of its base fee.
    let ref_bps = req.referral.as_ref().map(|r| r.ref_bps);

    // Plan both legs before writing anything; the legs touch different
    // pools, so the second plan is exact even though the first has not
    // committed yet.
    let expected_mid = match plan_swap(state, pool1_id, dir1, req.amount_in, 0, None) {
        Ok(plan) => plan,
        Err(err) => return business_failure(err),
    };
    let min_mid = if req.middle_out_ratio_bps == 0 {
        0
    } else {
        let allocated =
            ((req.slippage_bps as u32) * (req.middle_out_ratio_bps as u32) / MAX_BPS as u32) as Bps;
        deduct_bps(expected_mid.user_out, allocated)
    };
    let plan1 = match plan_swap(state, pool1_id, dir1, req.amount_in, min_mid, None) {
        Ok(plan) => plan,
        Err(err) => return business_failure(err),
    };
    let mid_amount = plan1.user_out;

    let expected_out = match plan_swap(state, pool2_id, dir2, mid_amount, 0, ref_bps) {
        Ok(plan) => plan,
        Err(err) => return business_failure(err),
    };
    let computed_min = deduct_bps(expected_out.user_out, req.slippage_bps);
    let min_out = req.min_amount_out.max(computed_min);
    let plan2 = match plan_swap(state, pool2_id, dir2, mid_amount, min_out, ref_bps) {
        Ok(plan) => plan,
        Err(err) => return business_failure(err),
    };

    // Both legs validated: commit atomically, then settle custody.
    custody.draw(&req.sender, &req.asset_in, req.amount_in)?;
    commit_swap(state, &plan1)?;
    commit_swap(state, &plan2)?;
    settle_payouts(state, custody, req, &plan2)?;

    Ok(SwapResult {
        success: true,
        amount_out: plan2.user_out,
        fee: plan1.total_fee() + plan2.total_fee(),
        route: vec![
            hop(req.asset_in.clone(), anchor.clone(), &plan1),
            hop(anchor.clone(), req.asset_out.clone(), &plan2),
        ],
        intermediate_amount: Some(mid_amount),
        error: None,
    })
}

/// Pay the referral beneficiary and the recipient for the final leg.
fn settle_payouts(
    state: &DexState,
    custody: &dyn AssetCustody,
    req: &RouteRequest,
    final_plan: &SwapPlan,
) -> AmmResult<()> {
    if final_plan.referral_out > 0 {
        let referral = req.referral.as_ref().ok_or_else(|| {
            AmmError::Invariant("referral payout planned without a beneficiary".to_string())
        })?;
        custody.transfer(
            &referral.beneficiary,
            &state.params.anchor_asset,
            final_plan.referral_out,
        )?;
    }
    custody.transfer(&req.recipient, &req.asset_out, final_plan.user_out)?;
    Ok(())
}

fn hop(asset_in: AssetId, asset_out: AssetId, plan: &SwapPlan) -> RouteHop {
    RouteHop {
        pool_id: plan.pool_id,
        asset_in,
        asset_out,
        amount_in: plan.amount_in,
        amount_out: plan.user_out,
        fee: plan.total_fee(),
    }
}

/// Map expected business failures to a failure result; custody faults and
/// invariant violations stay hard errors.
fn business_failure(err: AmmError) -> AmmResult<SwapResult> {
    match err {
        AmmError::Custody(_) | AmmError::Invariant(_) => Err(err),
        other => Ok(SwapResult::failure(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::MemoryCustody;
    use crate::liquidity::{add_liquidity, create_pool};
    use crate::state::DexParams;

    const ALICE: &str = "ledger:alice";
    const BOB: &str = "ledger:bob";

    fn request(asset_in: &str, asset_out: &str, amount_in: Amount) -> RouteRequest {
        RouteRequest {
            asset_in: asset_in.into(),
            asset_out: asset_out.into(),
            amount_in,
            min_amount_out: 0,
            slippage_bps: 50,
            middle_out_ratio_bps: 0,
            sender: Account::new(BOB),
            recipient: Account::new(BOB),
            referral: None,
        }
    }

    /// BTC/USD and USD/ETH pools seeded with deep liquidity
    fn setup() -> (DexState, MemoryCustody) {
        let mut state = DexState::new(DexParams::default());
        let custody = MemoryCustody::new();
        for asset in ["USD", "BTC", "ETH"] {
            custody.set_balance(ALICE, asset, 100_000_000);
            custody.set_balance(BOB, asset, 100_000_000);
        }
        let p1 = create_pool(&mut state, "BTC".into(), "USD".into(), None).unwrap();
        add_liquidity(&mut state, &custody, p1, 1_000_000, 2_000_000, &Account::new(ALICE))
            .unwrap();
        let p2 = create_pool(&mut state, "USD".into(), "ETH".into(), None).unwrap();
        add_liquidity(&mut state, &custody, p2, 2_000_000, 4_000_000, &Account::new(ALICE))
            .unwrap();
        (state, custody)
    }

    #[test]
    fn test_direct_route() {
        let (mut state, custody) = setup();
        let result = execute_route(&mut state, &custody, &request("BTC", "USD", 10_000)).unwrap();
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.route.len(), 1);
        assert_eq!(result.route[0].asset_in, AssetId::new("BTC"));
        assert_eq!(result.route[0].asset_out, AssetId::new("USD"));
        assert_eq!(result.route[0].amount_out, result.amount_out);
        assert!(result.intermediate_amount.is_none());
        assert!(result.amount_out > 0);
    }

    #[test]
    fn test_two_hop_route_through_anchor() {
        let (mut state, custody) = setup();
        let eth_before = custody.balance(&Account::new(BOB), &"ETH".into());

        let result = execute_route(&mut state, &custody, &request("BTC", "ETH", 10_000)).unwrap();
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.route.len(), 2);
        assert_eq!(result.route[0].asset_out, AssetId::new("USD"));
        assert_eq!(result.route[1].asset_in, AssetId::new("USD"));
        let mid = result.intermediate_amount.unwrap();
        assert_eq!(result.route[0].amount_out, mid);
        assert_eq!(result.route[1].amount_in, mid);
        assert_eq!(result.fee, result.route[0].fee + result.route[1].fee);
        assert_eq!(
            custody.balance(&Account::new(BOB), &"ETH".into()),
            eth_before + result.amount_out
        );
    }

    #[test]
    fn test_missing_hop_pool_fails_cleanly() {
        let (mut state, custody) = setup();
        // no DOGE pools at all
        let result = execute_route(&mut state, &custody, &request("BTC", "DOGE", 10_000)).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no pool found for second hop"));
        assert!(result.route.is_empty());

        let result = execute_route(&mut state, &custody, &request("DOGE", "ETH", 10_000)).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no pool found for first hop"));
    }

    #[test]
    fn test_anchor_leg_without_pool() {
        let (mut state, custody) = setup();
        // USD is the anchor itself, so no two-hop fallback exists
        let result = execute_route(&mut state, &custody, &request("USD", "DOGE", 10_000)).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no suitable pool found"));
    }

    #[test]
    fn test_identical_assets_rejected() {
        let (mut state, custody) = setup();
        let result = execute_route(&mut state, &custody, &request("BTC", "BTC", 10_000)).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("cannot swap asset to itself"));
    }

    #[test]
    fn test_two_hop_failure_is_atomic() {
        let (_state, custody) = setup();
        // Replace the USD/ETH leg with a pool so shallow the bridge amount
        // trips drain protection on the second hop.
        let mut thin = DexState::new(DexParams::default());
        let p1 = create_pool(&mut thin, "BTC".into(), "USD".into(), None).unwrap();
        add_liquidity(&mut thin, &custody, p1, 1_000_000, 2_000_000, &Account::new(ALICE))
            .unwrap();
        let p2 = create_pool(&mut thin, "USD".into(), "ETH".into(), None).unwrap();
        add_liquidity(&mut thin, &custody, p2, 1_000, 1_000, &Account::new(ALICE)).unwrap();

        let before_p1 = thin.pool(p1).unwrap().clone();
        let before_p2 = thin.pool(p2).unwrap().clone();
        let btc_before = custody.balance(&Account::new(BOB), &"BTC".into());

        let result = execute_route(&mut thin, &custody, &request("BTC", "ETH", 10_000)).unwrap();
        assert!(!result.success);
        assert!(result.route.is_empty());
        // neither leg committed and nothing was drawn
        assert_eq!(thin.pool(p1).unwrap(), &before_p1);
        assert_eq!(thin.pool(p2).unwrap(), &before_p2);
        assert_eq!(custody.balance(&Account::new(BOB), &"BTC".into()), btc_before);
    }

    #[test]
    fn test_caller_minimum_is_hard_floor() {
        let (mut state, custody) = setup();
        let mut req = request("BTC", "ETH", 10_000);
        req.min_amount_out = u64::MAX;
        let result = execute_route(&mut state, &custody, &req).unwrap();
        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("slippage tolerance exceeded"));
    }

    #[test]
    fn test_two_hop_referral_paid_in_anchor() {
        let (mut state, custody) = setup();
        let referrer = Account::new("ledger:referrer");
        let mut req = request("BTC", "ETH", 10_000);
        req.referral = Some(Referral {
            beneficiary: referrer.clone(),
            ref_bps: 1_000,
        });

        let result = execute_route(&mut state, &custody, &req).unwrap();
        assert!(result.success, "{:?}", result.error);
        // the second leg's base fee funds the referral, paid in USD
        assert!(custody.balance(&referrer, &"USD".into()) > 0);
    }

    #[test]
    fn test_middle_out_ratio_allocates_first_leg_tolerance() {
        let (mut state, custody) = setup();
        let mut req = request("BTC", "ETH", 10_000);
        req.middle_out_ratio_bps = MAX_BPS; // all tolerance on the first leg
        let result = execute_route(&mut state, &custody, &req).unwrap();
        assert!(result.success, "{:?}", result.error);
    }

    #[test]
    fn test_route_failure_has_empty_route_and_message() {
        let (mut state, custody) = setup();
        let mut req = request("BTC", "USD", 10_000);
        req.slippage_bps = 10_001;
        let result = execute_route(&mut state, &custody, &req).unwrap();
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.route.is_empty());
    }
}
