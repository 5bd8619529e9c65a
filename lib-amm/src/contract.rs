//! Contract-level operation surface.
//!
//! [`DexContract`] owns the ledger state and the custody collaborator and
//! exposes the operations the transaction sink dispatches: `init`,
//! `create_pool`, `execute` (swap / deposit / withdrawal by instruction
//! kind), `get_pool`, `claim_fees`, and the system-only maintenance
//! operations. The instruction payload is the versioned JSON schema from
//! `lib-schemas`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lib_schemas::{parse_json, Instruction, SchemaError};
use lib_types::{Account, Amount, AssetId, Bps, PoolId};

use crate::custody::AssetCustody;
use crate::errors::{AmmError, AmmResult};
use crate::liquidity;
use crate::routing::{execute_route, RouteRequest, SwapResult};
use crate::state::{CallContext, DexParams, DexState};
use crate::swap::Referral;

/// Error from a contract-level operation
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Amm(#[from] AmmError),
}

/// Result of a dispatched instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Swap(SwapResult),
    Deposit { minted: Amount },
    Withdrawal { amount0: Amount, amount1: Amount },
}

/// Pool projection served to queries, aligned with the read-model schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub id: PoolId,
    pub asset0: AssetId,
    pub asset1: AssetId,
    pub reserve0: Amount,
    pub reserve1: Amount,
    /// Basis points; the external indexer re-serves this as a percentage
    pub fee: Bps,
    pub total_supply: Amount,
}

impl PoolInfo {
    fn project(pool: &crate::state::Pool) -> Self {
        Self {
            id: pool.id,
            asset0: pool.asset0.clone(),
            asset1: pool.asset1.clone(),
            reserve0: pool.reserve0,
            reserve1: pool.reserve1,
            fee: pool.fee_bps,
            total_supply: pool.total_claims,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatePoolParams {
    asset0: AssetId,
    asset1: AssetId,
    #[serde(default)]
    fee_bps: Option<Bps>,
}

/// The DEX contract: ledger state plus its custody collaborator.
pub struct DexContract<C: AssetCustody> {
    state: DexState,
    custody: C,
}

impl<C: AssetCustody> DexContract<C> {
    pub fn new(custody: C) -> Self {
        Self {
            state: DexState::new(DexParams::default()),
            custody,
        }
    }

    pub fn with_params(params: DexParams, custody: C) -> Self {
        Self {
            state: DexState::new(params),
            custody,
        }
    }

    /// Record the contract version. Defaults to "1.0.0".
    pub fn init(&mut self, version: Option<&str>) {
        let version = match version {
            Some(v) if !v.trim().is_empty() => v.trim(),
            _ => "1.0.0",
        };
        self.state.params.version = version.to_string();
    }

    pub fn state(&self) -> &DexState {
        &self.state
    }

    /// Create a pool from a JSON payload:
    /// `{"asset0": "USD", "asset1": "BTC", "fee_bps": 8}`
    pub fn create_pool(&mut self, payload: &str) -> Result<PoolId, ContractError> {
        let params: CreatePoolParams = serde_json::from_str(payload)
            .map_err(|err| ContractError::InvalidPayload(err.to_string()))?;
        Ok(liquidity::create_pool(
            &mut self.state,
            params.asset0,
            params.asset1,
            params.fee_bps,
        )?)
    }

    /// Dispatch a versioned instruction document.
    ///
    /// `amount_in` is the input amount for swap instructions, supplied by
    /// the surrounding deposit/transaction rather than the document
    /// itself. Deposits and withdrawals carry their amounts in metadata.
    ///
    /// Swap business failures come back as a success-flagged
    /// [`SwapResult`]; parse failures and liquidity errors are returned
    /// as errors.
    pub fn execute(
        &mut self,
        ctx: &CallContext,
        payload: &[u8],
        amount_in: Amount,
    ) -> Result<ExecutionOutcome, ContractError> {
        match parse_json(payload)? {
            Instruction::Swap(swap) => {
                let referral = match (swap.beneficiary, swap.ref_bps) {
                    (Some(beneficiary), Some(ref_bps)) => Some(Referral {
                        beneficiary,
                        ref_bps,
                    }),
                    _ => None,
                };
                let request = RouteRequest {
                    asset_in: swap.asset_in,
                    asset_out: swap.asset_out,
                    amount_in,
                    min_amount_out: swap.min_amount_out,
                    slippage_bps: swap.slippage_bps,
                    middle_out_ratio_bps: 0,
                    sender: ctx.sender.clone(),
                    recipient: swap.recipient,
                    referral,
                };
                let result = execute_route(&mut self.state, &self.custody, &request)?;
                Ok(ExecutionOutcome::Swap(result))
            }
            Instruction::Deposit(deposit) => {
                let pool_id = self
                    .state
                    .find_pool(&deposit.asset_in, &deposit.asset_out)
                    .map(|p| p.id)
                    .ok_or_else(|| {
                        AmmError::NoPoolForPair(deposit.asset_in.clone(), deposit.asset_out.clone())
                    })?;
                let minted = liquidity::add_liquidity(
                    &mut self.state,
                    &self.custody,
                    pool_id,
                    deposit.amount0,
                    deposit.amount1,
                    &ctx.sender,
                )?;
                Ok(ExecutionOutcome::Deposit { minted })
            }
            Instruction::Withdrawal(withdrawal) => {
                let pool_id = self
                    .state
                    .find_pool(&withdrawal.asset_in, &withdrawal.asset_out)
                    .map(|p| p.id)
                    .ok_or_else(|| {
                        AmmError::NoPoolForPair(
                            withdrawal.asset_in.clone(),
                            withdrawal.asset_out.clone(),
                        )
                    })?;
                let (amount0, amount1) = liquidity::remove_liquidity(
                    &mut self.state,
                    &self.custody,
                    pool_id,
                    withdrawal.lp_amount,
                    &ctx.sender,
                )?;
                Ok(ExecutionOutcome::Withdrawal { amount0, amount1 })
            }
        }
    }

    /// Pool projection for queries; `None` for unknown ids.
    pub fn get_pool(&self, pool_id: PoolId) -> Option<PoolInfo> {
        self.state.pool(pool_id).map(PoolInfo::project)
    }

    /// All pool projections in id order.
    pub fn pools(&self) -> Vec<PoolInfo> {
        self.state.pools().map(PoolInfo::project).collect()
    }

    /// Withdraw the anchor-side fee bucket. System-only.
    pub fn claim_fees(&mut self, ctx: &CallContext, pool_id: PoolId) -> AmmResult<Amount> {
        liquidity::claim_fees(&mut self.state, &self.custody, pool_id, ctx)
    }

    pub fn donate(
        &mut self,
        ctx: &CallContext,
        pool_id: PoolId,
        amount0: Amount,
        amount1: Amount,
    ) -> AmmResult<()> {
        liquidity::donate(
            &mut self.state,
            &self.custody,
            pool_id,
            amount0,
            amount1,
            &ctx.sender,
        )
    }

    pub fn transfer_claim(
        &mut self,
        ctx: &CallContext,
        pool_id: PoolId,
        to: &Account,
        amount: Amount,
    ) -> AmmResult<()> {
        liquidity::transfer_claim(&mut self.state, pool_id, &ctx.sender, to, amount)
    }

    pub fn burn_claim(&mut self, ctx: &CallContext, pool_id: PoolId, amount: Amount) -> AmmResult<()> {
        liquidity::burn_claim(&mut self.state, pool_id, &ctx.sender, amount)
    }

    pub fn emergency_withdraw(
        &mut self,
        ctx: &CallContext,
        pool_id: PoolId,
        provider: &Account,
        claim_amount: Amount,
    ) -> AmmResult<(Amount, Amount)> {
        liquidity::emergency_withdraw(
            &mut self.state,
            &self.custody,
            pool_id,
            claim_amount,
            provider,
            ctx,
        )
    }

    pub fn set_base_fee(&mut self, ctx: &CallContext, pool_id: PoolId, fee_bps: Bps) -> AmmResult<()> {
        liquidity::set_base_fee(&mut self.state, pool_id, fee_bps, ctx)
    }

    pub fn set_slip_params(
        &mut self,
        ctx: &CallContext,
        baseline_bps: Bps,
        share_bps: Bps,
    ) -> AmmResult<()> {
        liquidity::set_slip_params(&mut self.state, baseline_bps, share_bps, ctx)
    }
}
