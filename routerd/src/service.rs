//! Route computation and instruction handling.
//!
//! The service projects routes read-only against read-model snapshots,
//! running the engine's own plan arithmetic so the projection and the
//! eventual on-ledger execution cannot diverge. Validated instructions
//! are then submitted to the transaction sink; the ledger remains the
//! only place reserves change.

use tracing::{info, warn};

use lib_amm::{plan_swap, AmmError, DexParams, DexState, RouteHop, SwapResult};
use lib_amm::math::deduct_bps;
use lib_schemas::Instruction;
use lib_types::{Account, Amount, AssetId, Bps, MAX_BPS};

use crate::directory::{PoolDirectory, PoolSnapshot};
use crate::errors::RouterResult;
use crate::executor::DexExecutor;

/// A route computation request
#[derive(Debug, Clone)]
pub struct RouteQuery {
    pub from_asset: AssetId,
    pub to_asset: AssetId,
    pub amount: Amount,
    /// Hard floor on the final output
    pub min_out: Amount,
    pub slippage_bps: Bps,
    pub sender: Option<Account>,
}

/// DEX routing service over a pool directory and a transaction sink
pub struct RouterService<D, E> {
    directory: D,
    executor: E,
    anchor: AssetId,
}

impl<D: PoolDirectory + Sync, E: DexExecutor + Sync> RouterService<D, E> {
    pub fn new(directory: D, executor: E, anchor: AssetId) -> Self {
        Self {
            directory,
            executor,
            anchor,
        }
    }

    /// Compute the route and expected amounts for a prospective swap.
    ///
    /// Read-only: no reserve state changes anywhere. Stale reads are
    /// tolerated by design; the minimum-output floors carried by the
    /// eventual instruction protect against divergence at execution time.
    pub async fn compute_route(&self, query: &RouteQuery) -> RouterResult<SwapResult> {
        if query.from_asset == query.to_asset {
            return Ok(SwapResult::failure("cannot swap asset to itself"));
        }
        if query.amount == 0 {
            return Ok(SwapResult::failure("amount must be greater than zero"));
        }
        if query.slippage_bps > MAX_BPS {
            return Ok(SwapResult::failure("slippage bps out of range"));
        }

        if let Some(snapshot) = self
            .directory
            .find_pool(&query.from_asset, &query.to_asset)
            .await?
        {
            return Ok(self.project_direct(&snapshot, query));
        }

        if query.from_asset != self.anchor && query.to_asset != self.anchor {
            let Some(first) = self.directory.find_pool(&query.from_asset, &self.anchor).await?
            else {
                return Ok(SwapResult::failure("no pool found for first hop"));
            };
            let Some(second) = self.directory.find_pool(&self.anchor, &query.to_asset).await?
            else {
                return Ok(SwapResult::failure("no pool found for second hop"));
            };
            return Ok(self.project_two_hop(&first, &second, query));
        }

        Ok(SwapResult::failure("no suitable pool found"))
    }

    /// Handle a raw instruction document: parse, project, submit.
    ///
    /// Swap instructions are only submitted when the projection succeeds;
    /// the returned result carries the projected amounts. Deposits and
    /// withdrawals are forwarded as-is.
    pub async fn execute_instruction(
        &self,
        raw: &[u8],
        amount_in: Amount,
    ) -> RouterResult<SwapResult> {
        if amount_in == 0 {
            return Ok(SwapResult::failure("amount must be greater than zero"));
        }
        let instruction = lib_schemas::parse_json(raw)?;
        let payload = String::from_utf8_lossy(raw).into_owned();

        match instruction {
            Instruction::Swap(swap) => {
                let query = RouteQuery {
                    from_asset: swap.asset_in,
                    to_asset: swap.asset_out,
                    amount: amount_in,
                    min_out: swap.min_amount_out,
                    slippage_bps: swap.slippage_bps,
                    sender: Some(swap.recipient),
                };
                let projection = self.compute_route(&query).await?;
                if !projection.success {
                    warn!(error = ?projection.error, "swap instruction rejected by projection");
                    return Ok(projection);
                }
                self.executor.execute_operation("execute", &payload).await?;
                info!(amount_out = projection.amount_out, hops = projection.route.len(),
                    "swap instruction submitted");
                Ok(projection)
            }
            Instruction::Deposit(_) | Instruction::Withdrawal(_) => {
                self.executor.execute_operation("execute", &payload).await?;
                Ok(SwapResult {
                    success: true,
                    amount_out: 0,
                    fee: 0,
                    route: Vec::new(),
                    intermediate_amount: None,
                    error: None,
                })
            }
        }
    }

    /// View the snapshots as a ledger so plans use engine arithmetic.
    fn view(&self, snapshots: &[&PoolSnapshot]) -> DexState {
        let params = DexParams {
            anchor_asset: self.anchor.clone(),
            ..DexParams::default()
        };
        DexState::with_pools(params, snapshots.iter().map(|s| s.to_pool()).collect())
    }

    fn project_direct(&self, snapshot: &PoolSnapshot, query: &RouteQuery) -> SwapResult {
        let state = self.view(&[snapshot]);
        let Some(direction) = state
            .pool(snapshot.id)
            .and_then(|p| p.direction_for(&query.from_asset))
        else {
            return SwapResult::failure("invalid asset pair for pool");
        };

        let expected = match plan_swap(&state, snapshot.id, direction, query.amount, 0, None) {
            Ok(plan) => plan,
            Err(err) => return projection_failure(err),
        };
        let min_out = query
            .min_out
            .max(deduct_bps(expected.user_out, query.slippage_bps));
        match plan_swap(&state, snapshot.id, direction, query.amount, min_out, None) {
            Ok(plan) => SwapResult {
                success: true,
                amount_out: plan.user_out,
                fee: plan.total_fee(),
                route: vec![RouteHop {
                    pool_id: snapshot.id,
                    asset_in: query.from_asset.clone(),
                    asset_out: query.to_asset.clone(),
                    amount_in: query.amount,
                    amount_out: plan.user_out,
                    fee: plan.total_fee(),
                }],
                intermediate_amount: None,
                error: None,
            },
            Err(err) => projection_failure(err),
        }
    }

    fn project_two_hop(
        &self,
        first: &PoolSnapshot,
        second: &PoolSnapshot,
        query: &RouteQuery,
    ) -> SwapResult {
        let state = self.view(&[first, second]);
        let Some(dir1) = state
            .pool(first.id)
            .and_then(|p| p.direction_for(&query.from_asset))
        else {
            return SwapResult::failure("invalid asset pair for pool");
        };
        let Some(dir2) = state
            .pool(second.id)
            .and_then(|p| p.direction_for(&self.anchor))
        else {
            return SwapResult::failure("invalid asset pair for pool");
        };

        let plan1 = match plan_swap(&state, first.id, dir1, query.amount, 0, None) {
            Ok(plan) => plan,
            Err(err) => return projection_failure(err),
        };
        let mid_amount = plan1.user_out;

        let expected = match plan_swap(&state, second.id, dir2, mid_amount, 0, None) {
            Ok(plan) => plan,
            Err(err) => return projection_failure(err),
        };
        let min_out = query
            .min_out
            .max(deduct_bps(expected.user_out, query.slippage_bps));
        let plan2 = match plan_swap(&state, second.id, dir2, mid_amount, min_out, None) {
            Ok(plan) => plan,
            Err(err) => return projection_failure(err),
        };

        SwapResult {
            success: true,
            amount_out: plan2.user_out,
            fee: plan1.total_fee() + plan2.total_fee(),
            route: vec![
                RouteHop {
                    pool_id: first.id,
                    asset_in: query.from_asset.clone(),
                    asset_out: self.anchor.clone(),
                    amount_in: query.amount,
                    amount_out: mid_amount,
                    fee: plan1.total_fee(),
                },
                RouteHop {
                    pool_id: second.id,
                    asset_in: self.anchor.clone(),
                    asset_out: query.to_asset.clone(),
                    amount_in: mid_amount,
                    amount_out: plan2.user_out,
                    fee: plan2.total_fee(),
                },
            ],
            intermediate_amount: Some(mid_amount),
            error: None,
        }
    }
}

fn projection_failure(err: AmmError) -> SwapResult {
    SwapResult::failure(err.to_string())
}
