//! Pool ledger operations: pool creation, liquidity provision and
//! withdrawal, claim transfers, fee claims, and the system-only
//! parameter and safety operations.
//!
//! Every operation validates fully before its first state write. Where an
//! operation both mutates the ledger and pays funds out, bookkeeping
//! happens first and custody payouts last, so a reentrant custody
//! collaborator can never observe claims it could double-spend.

use lib_types::{Account, Amount, AssetId, Bps, PoolId, MAX_BPS};

use crate::custody::AssetCustody;
use crate::errors::{AmmError, AmmResult};
use crate::math::{mul_div, sqrt_u128};
use crate::state::{CallContext, DexState, Pool, DEFAULT_BASE_FEE_BPS};

/// Create a new pool for an asset pair.
///
/// `fee_bps` of zero or `None` selects the default base fee (8 bps).
pub fn create_pool(
    state: &mut DexState,
    asset0: AssetId,
    asset1: AssetId,
    fee_bps: Option<Bps>,
) -> AmmResult<PoolId> {
    if asset0 == asset1 {
        return Err(AmmError::IdenticalAssets);
    }
    let fee_bps = match fee_bps {
        None | Some(0) => DEFAULT_BASE_FEE_BPS,
        Some(bps) => bps,
    };
    if fee_bps >= MAX_BPS {
        return Err(AmmError::FeeBpsOutOfRange(fee_bps));
    }

    let id = state.allocate_pool_id();
    state.insert_pool(Pool {
        id,
        asset0,
        asset1,
        reserve0: 0,
        reserve1: 0,
        fee_bps,
        total_claims: 0,
        fee_bucket0: 0,
        fee_bucket1: 0,
        fee_last_claim: None,
    });
    Ok(id)
}

/// Deposit liquidity and mint proportional claims.
///
/// The first deposit is sized by the geometric mean of the two amounts,
/// computed over the exact 128-bit product. Subsequent deposits mint the
/// more constraining of the two proportional contributions, so an
/// imbalanced deposit cannot dilute existing providers.
pub fn add_liquidity(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    pool_id: PoolId,
    amount0: Amount,
    amount1: Amount,
    provider: &Account,
) -> AmmResult<Amount> {
    let pool = state.pool(pool_id).ok_or(AmmError::PoolNotFound(pool_id))?;
    let (asset0, asset1) = (pool.asset0.clone(), pool.asset1.clone());
    let (reserve0, reserve1, total) = (pool.reserve0, pool.reserve1, pool.total_claims);

    let minted = if total == 0 {
        sqrt_u128((amount0 as u128) * (amount1 as u128))
    } else {
        let m0 = mul_div(amount0, total, reserve0).ok_or(AmmError::OutOfBounds)?;
        let m1 = mul_div(amount1, total, reserve1).ok_or(AmmError::OutOfBounds)?;
        m0.min(m1)
    };
    if minted == 0 {
        return Err(AmmError::ZeroClaimsMinted);
    }

    let new_reserve0 = reserve0.checked_add(amount0).ok_or(AmmError::OutOfBounds)?;
    let new_reserve1 = reserve1.checked_add(amount1).ok_or(AmmError::OutOfBounds)?;
    let new_total = total.checked_add(minted).ok_or(AmmError::OutOfBounds)?;

    custody.draw(provider, &asset0, amount0)?;
    custody.draw(provider, &asset1, amount1)?;

    let pool = state
        .pool_mut(pool_id)
        .ok_or(AmmError::PoolNotFound(pool_id))?;
    pool.reserve0 = new_reserve0;
    pool.reserve1 = new_reserve1;
    pool.total_claims = new_total;

    let balance = state.claim_balance(pool_id, provider);
    state.set_claim_balance(pool_id, provider, balance + minted);
    Ok(minted)
}

/// Burn claims and return the proportional share of both reserves.
pub fn remove_liquidity(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    pool_id: PoolId,
    claim_amount: Amount,
    provider: &Account,
) -> AmmResult<(Amount, Amount)> {
    redeem_claims(state, custody, pool_id, claim_amount, provider)
}

/// Increase reserves without minting claims.
///
/// A one-sided value injection: the donated amounts are shared pro rata by
/// all current claim holders.
pub fn donate(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    pool_id: PoolId,
    amount0: Amount,
    amount1: Amount,
    donor: &Account,
) -> AmmResult<()> {
    let pool = state.pool(pool_id).ok_or(AmmError::PoolNotFound(pool_id))?;
    let (asset0, asset1) = (pool.asset0.clone(), pool.asset1.clone());
    let new_reserve0 = pool
        .reserve0
        .checked_add(amount0)
        .ok_or(AmmError::OutOfBounds)?;
    let new_reserve1 = pool
        .reserve1
        .checked_add(amount1)
        .ok_or(AmmError::OutOfBounds)?;

    custody.draw(donor, &asset0, amount0)?;
    custody.draw(donor, &asset1, amount1)?;

    let pool = state
        .pool_mut(pool_id)
        .ok_or(AmmError::PoolNotFound(pool_id))?;
    pool.reserve0 = new_reserve0;
    pool.reserve1 = new_reserve1;
    Ok(())
}

/// Move claim balance between accounts. Reserves are untouched.
pub fn transfer_claim(
    state: &mut DexState,
    pool_id: PoolId,
    from: &Account,
    to: &Account,
    amount: Amount,
) -> AmmResult<()> {
    if amount == 0 {
        return Err(AmmError::ZeroAmount);
    }
    if state.pool(pool_id).is_none() {
        return Err(AmmError::PoolNotFound(pool_id));
    }
    let from_balance = state.claim_balance(pool_id, from);
    if from_balance < amount {
        return Err(AmmError::InsufficientClaims {
            have: from_balance,
            need: amount,
        });
    }
    let to_balance = state.claim_balance(pool_id, to);
    let new_to = to_balance.checked_add(amount).ok_or(AmmError::OutOfBounds)?;

    state.set_claim_balance(pool_id, from, from_balance - amount);
    state.set_claim_balance(pool_id, to, new_to);
    Ok(())
}

/// Permanently destroy claim balance without returning reserves.
///
/// Remaining holders' share of the reserves grows proportionally.
pub fn burn_claim(
    state: &mut DexState,
    pool_id: PoolId,
    owner: &Account,
    amount: Amount,
) -> AmmResult<()> {
    if amount == 0 {
        return Err(AmmError::ZeroAmount);
    }
    let balance = state.claim_balance(pool_id, owner);
    if balance < amount {
        return Err(AmmError::InsufficientClaims {
            have: balance,
            need: amount,
        });
    }
    let pool = state
        .pool_mut(pool_id)
        .ok_or(AmmError::PoolNotFound(pool_id))?;
    pool.total_claims = pool
        .total_claims
        .checked_sub(amount)
        .ok_or_else(|| AmmError::Invariant("claim supply below burned balance".to_string()))?;
    state.set_claim_balance(pool_id, owner, balance - amount);
    Ok(())
}

/// Withdraw the anchor-side fee bucket to the protocol fee recipient.
///
/// System-only. Only the anchor asset's bucket is claimable; the other
/// bucket never accrues in the base design.
pub fn claim_fees(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    pool_id: PoolId,
    ctx: &CallContext,
) -> AmmResult<Amount> {
    if !ctx.system {
        return Err(AmmError::Unauthorized);
    }
    let anchor = state.params.anchor_asset.clone();
    let fee_recipient = state.params.fee_recipient.clone();
    let pool = state
        .pool_mut(pool_id)
        .ok_or(AmmError::PoolNotFound(pool_id))?;

    let claimed = if pool.asset0 == anchor {
        std::mem::take(&mut pool.fee_bucket0)
    } else if pool.asset1 == anchor {
        std::mem::take(&mut pool.fee_bucket1)
    } else {
        0
    };
    pool.fee_last_claim = ctx.timestamp.clone();

    if claimed > 0 {
        custody.transfer(&fee_recipient, &anchor, claimed)?;
    }
    Ok(claimed)
}

/// System-only forced redemption of a named provider's claims.
///
/// The consensus-level safety hatch: same math as a voluntary withdrawal,
/// but authorized by the system instead of the claim owner.
pub fn emergency_withdraw(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    pool_id: PoolId,
    claim_amount: Amount,
    provider: &Account,
    ctx: &CallContext,
) -> AmmResult<(Amount, Amount)> {
    if !ctx.system {
        return Err(AmmError::Unauthorized);
    }
    redeem_claims(state, custody, pool_id, claim_amount, provider)
}

/// Update a pool's base fee. System-only; must stay below 100%.
pub fn set_base_fee(
    state: &mut DexState,
    pool_id: PoolId,
    fee_bps: Bps,
    ctx: &CallContext,
) -> AmmResult<()> {
    if !ctx.system {
        return Err(AmmError::Unauthorized);
    }
    if fee_bps >= MAX_BPS {
        return Err(AmmError::FeeBpsOutOfRange(fee_bps));
    }
    let pool = state
        .pool_mut(pool_id)
        .ok_or(AmmError::PoolNotFound(pool_id))?;
    pool.fee_bps = fee_bps;
    Ok(())
}

/// Update the slippage-fee parameters. System-only.
pub fn set_slip_params(
    state: &mut DexState,
    baseline_bps: Bps,
    share_bps: Bps,
    ctx: &CallContext,
) -> AmmResult<()> {
    if !ctx.system {
        return Err(AmmError::Unauthorized);
    }
    if baseline_bps > MAX_BPS {
        return Err(AmmError::FeeBpsOutOfRange(baseline_bps));
    }
    if share_bps > MAX_BPS {
        return Err(AmmError::FeeBpsOutOfRange(share_bps));
    }
    state.params.slip_baseline_bps = baseline_bps;
    state.params.slip_share_bps = share_bps;
    Ok(())
}

/// Shared redemption path for voluntary and forced withdrawals.
fn redeem_claims(
    state: &mut DexState,
    custody: &dyn AssetCustody,
    pool_id: PoolId,
    claim_amount: Amount,
    provider: &Account,
) -> AmmResult<(Amount, Amount)> {
    if claim_amount == 0 {
        return Err(AmmError::ZeroAmount);
    }
    let balance = state.claim_balance(pool_id, provider);
    if balance < claim_amount {
        return Err(AmmError::InsufficientClaims {
            have: balance,
            need: claim_amount,
        });
    }
    let pool = state.pool(pool_id).ok_or(AmmError::PoolNotFound(pool_id))?;
    let total = pool.total_claims;
    if total == 0 {
        return Err(AmmError::Invariant(
            "claim balance present with zero claim supply".to_string(),
        ));
    }
    let (asset0, asset1) = (pool.asset0.clone(), pool.asset1.clone());
    let amount0 = mul_div(pool.reserve0, claim_amount, total).ok_or(AmmError::OutOfBounds)?;
    let amount1 = mul_div(pool.reserve1, claim_amount, total).ok_or(AmmError::OutOfBounds)?;

    // Bookkeeping before payout.
    let pool = state
        .pool_mut(pool_id)
        .ok_or(AmmError::PoolNotFound(pool_id))?;
    pool.total_claims = total - claim_amount;
    pool.reserve0 -= amount0;
    pool.reserve1 -= amount1;
    state.set_claim_balance(pool_id, provider, balance - claim_amount);

    custody.transfer(provider, &asset0, amount0)?;
    custody.transfer(provider, &asset1, amount1)?;
    Ok((amount0, amount1))
}
