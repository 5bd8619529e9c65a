//! Pool ledger state.
//!
//! The engine holds all pool records and liquidity-claim balances in one
//! explicit state object. There is no ambient or global storage: every
//! operation takes the state by reference, and the state lives exactly as
//! long as the ledger instance that owns it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use lib_types::{Account, Amount, AssetId, Bps, PoolId};

/// Default base fee for new pools: 8 bps (0.08%)
pub const DEFAULT_BASE_FEE_BPS: Bps = 8;

/// Swap direction within a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// asset0 in, asset1 out
    ZeroToOne,
    /// asset1 in, asset0 out
    OneToZero,
}

impl Direction {
    /// The opposite direction
    pub fn reversed(self) -> Self {
        match self {
            Direction::ZeroToOne => Direction::OneToZero,
            Direction::OneToZero => Direction::ZeroToOne,
        }
    }
}

/// A liquidity pool record.
///
/// `asset0` is the fee-bearing side in single-pair deployments; in the
/// pooled router the anchor asset of `DexParams` decides fee accrual, so
/// the pair ordering here only fixes which reserve is which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub asset0: AssetId,
    pub asset1: AssetId,
    pub reserve0: Amount,
    pub reserve1: Amount,
    pub fee_bps: Bps,
    pub total_claims: Amount,
    /// Accrued claimable fees on the asset0 side
    pub fee_bucket0: Amount,
    /// Accrued claimable fees on the asset1 side (never credited in the
    /// base design; kept so the record matches the wire projection)
    pub fee_bucket1: Amount,
    /// Opaque marker stamped by the last fee claim
    pub fee_last_claim: Option<String>,
}

impl Pool {
    /// Input and output reserves for a swap direction
    pub fn reserves(&self, direction: Direction) -> (Amount, Amount) {
        match direction {
            Direction::ZeroToOne => (self.reserve0, self.reserve1),
            Direction::OneToZero => (self.reserve1, self.reserve0),
        }
    }

    /// Input and output assets for a swap direction
    pub fn assets(&self, direction: Direction) -> (&AssetId, &AssetId) {
        match direction {
            Direction::ZeroToOne => (&self.asset0, &self.asset1),
            Direction::OneToZero => (&self.asset1, &self.asset0),
        }
    }

    /// Direction that consumes `asset_in`, if it belongs to this pool
    pub fn direction_for(&self, asset_in: &AssetId) -> Option<Direction> {
        if *asset_in == self.asset0 {
            Some(Direction::ZeroToOne)
        } else if *asset_in == self.asset1 {
            Some(Direction::OneToZero)
        } else {
            None
        }
    }

    /// Whether this pool trades the given pair (either orientation)
    pub fn matches_pair(&self, a: &AssetId, b: &AssetId) -> bool {
        (self.asset0 == *a && self.asset1 == *b) || (self.asset0 == *b && self.asset1 == *a)
    }

    pub fn has_liquidity(&self) -> bool {
        self.reserve0 > 0 && self.reserve1 > 0
    }
}

/// System-wide engine parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexParams {
    /// Schema/contract version string
    pub version: String,
    /// The bridge / fee-bearing asset
    pub anchor_asset: AssetId,
    /// Recipient of claimed protocol fees
    pub fee_recipient: Account,
    /// Slippage-fee baseline in bps (slippage below this accrues no extra fee)
    pub slip_baseline_bps: Bps,
    /// Share of excess slippage clawed back to the pool, in bps
    pub slip_share_bps: Bps,
}

impl Default for DexParams {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            anchor_asset: AssetId::new("USD"),
            fee_recipient: Account::new("system:fees"),
            // slippage fee is off by default
            slip_baseline_bps: 0,
            slip_share_bps: 0,
        }
    }
}

/// Caller identity for privileged and custody-touching operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Account,
    /// Set only when the underlying ledger authenticated a system caller
    pub system: bool,
    /// Ledger-supplied marker (e.g. block timestamp) for bookkeeping
    pub timestamp: Option<String>,
}

impl CallContext {
    pub fn user(sender: impl Into<Account>) -> Self {
        Self {
            sender: sender.into(),
            system: false,
            timestamp: None,
        }
    }

    pub fn system(sender: impl Into<Account>) -> Self {
        Self {
            sender: sender.into(),
            system: true,
            timestamp: None,
        }
    }
}

/// The complete pool ledger state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexState {
    pub params: DexParams,
    next_pool_id: PoolId,
    pools: BTreeMap<PoolId, Pool>,
    claims: BTreeMap<(PoolId, Account), Amount>,
}

impl DexState {
    /// Create a fresh ledger with the given parameters
    pub fn new(params: DexParams) -> Self {
        Self {
            params,
            next_pool_id: 1,
            pools: BTreeMap::new(),
            claims: BTreeMap::new(),
        }
    }

    /// Build a ledger view from existing pool records.
    ///
    /// Used by read-model consumers to run engine arithmetic (quotes,
    /// plans) against externally-observed pool state. Claim balances are
    /// not part of the view.
    pub fn with_pools(params: DexParams, pools: Vec<Pool>) -> Self {
        let next_pool_id = pools.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        Self {
            params,
            next_pool_id,
            pools: pools.into_iter().map(|p| (p.id, p)).collect(),
            claims: BTreeMap::new(),
        }
    }

    /// Reserve the next sequential pool id
    pub(crate) fn allocate_pool_id(&mut self) -> PoolId {
        let id = self.next_pool_id;
        self.next_pool_id += 1;
        id
    }

    pub(crate) fn insert_pool(&mut self, pool: Pool) {
        self.pools.insert(pool.id, pool);
    }

    pub fn pool(&self, id: PoolId) -> Option<&Pool> {
        self.pools.get(&id)
    }

    pub(crate) fn pool_mut(&mut self, id: PoolId) -> Option<&mut Pool> {
        self.pools.get_mut(&id)
    }

    /// All pools in id order
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Lowest-id pool trading the pair, in either orientation
    pub fn find_pool(&self, a: &AssetId, b: &AssetId) -> Option<&Pool> {
        self.pools.values().find(|p| p.matches_pair(a, b))
    }

    /// A provider's claim balance in a pool (zero when absent)
    pub fn claim_balance(&self, pool_id: PoolId, account: &Account) -> Amount {
        self.claims
            .get(&(pool_id, account.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn set_claim_balance(&mut self, pool_id: PoolId, account: &Account, amount: Amount) {
        if amount == 0 {
            self.claims.remove(&(pool_id, account.clone()));
        } else {
            self.claims.insert((pool_id, account.clone()), amount);
        }
    }

    /// Sum of all claim balances for a pool.
    ///
    /// Must always equal the pool's `total_claims`; exposed so tests and
    /// audits can verify the invariant.
    pub fn claim_supply(&self, pool_id: PoolId) -> Amount {
        self.claims
            .iter()
            .filter(|((pid, _), _)| *pid == pool_id)
            .map(|(_, amount)| *amount)
            .sum()
    }
}
