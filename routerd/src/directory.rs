//! Pool discovery boundary.
//!
//! When the router runs outside the ledger process, pool state comes from
//! an external read-model provider. The [`PoolDirectory`] trait is that
//! boundary; reads may lag the ledger, and "pool not found" is a normal
//! answer, never a hard error.

use std::future::Future;

use serde::{Deserialize, Serialize};

use lib_types::{Amount, AssetId, Bps, PoolId};

use crate::errors::RouterResult;

/// A point-in-time pool observation from the read model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub asset0: AssetId,
    pub asset1: AssetId,
    pub reserve0: Amount,
    pub reserve1: Amount,
    pub fee_bps: Bps,
    pub total_supply: Amount,
}

impl PoolSnapshot {
    /// Whether this pool trades the given pair (either orientation)
    pub fn matches_pair(&self, a: &AssetId, b: &AssetId) -> bool {
        (self.asset0 == *a && self.asset1 == *b) || (self.asset0 == *b && self.asset1 == *a)
    }

    /// Materialize the snapshot as an engine pool record so projections
    /// run the engine's own arithmetic.
    pub fn to_pool(&self) -> lib_amm::Pool {
        lib_amm::Pool {
            id: self.id,
            asset0: self.asset0.clone(),
            asset1: self.asset1.clone(),
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            fee_bps: self.fee_bps,
            total_claims: self.total_supply,
            fee_bucket0: 0,
            fee_bucket1: 0,
            fee_last_claim: None,
        }
    }
}

/// Read-model pool discovery
pub trait PoolDirectory {
    /// Look up a pool by id; `None` when the read model does not know it
    fn pool_by_id(
        &self,
        id: PoolId,
    ) -> impl Future<Output = RouterResult<Option<PoolSnapshot>>> + Send;

    /// Lowest-id pool trading the pair, in either orientation
    fn find_pool(
        &self,
        a: &AssetId,
        b: &AssetId,
    ) -> impl Future<Output = RouterResult<Option<PoolSnapshot>>> + Send;
}

/// Static directory for tests and embedded deployments
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    pools: Vec<PoolSnapshot>,
}

impl InMemoryDirectory {
    pub fn new(mut pools: Vec<PoolSnapshot>) -> Self {
        pools.sort_by_key(|p| p.id);
        Self { pools }
    }
}

impl PoolDirectory for InMemoryDirectory {
    async fn pool_by_id(&self, id: PoolId) -> RouterResult<Option<PoolSnapshot>> {
        Ok(self.pools.iter().find(|p| p.id == id).cloned())
    }

    async fn find_pool(&self, a: &AssetId, b: &AssetId) -> RouterResult<Option<PoolSnapshot>> {
        Ok(self.pools.iter().find(|p| p.matches_pair(a, b)).cloned())
    }
}
