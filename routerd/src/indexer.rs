//! Indexer read-model client.
//!
//! Queries the external pool indexer over HTTP. The indexer serves fees
//! as percentages (0.08 means 8 bps); the engine speaks basis points, so
//! the unit conversion happens here and nowhere else. A 404 means "no
//! pool", matching the directory contract; timeouts and other non-200
//! responses fail the route computation without touching any state.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use lib_types::{AssetId, PoolId};

use crate::directory::{PoolDirectory, PoolSnapshot};
use crate::errors::{RouterError, RouterResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the pool read model
#[derive(Debug, Clone)]
pub struct IndexerClient {
    endpoint: String,
    client: reqwest::Client,
}

/// Raw pool document as the indexer serves it (fee as a percentage)
#[derive(Debug, Deserialize)]
struct PoolRecord {
    id: String,
    asset0: String,
    asset1: String,
    reserve0: u64,
    reserve1: u64,
    fee: f64,
    total_supply: u64,
}

impl PoolRecord {
    fn into_snapshot(self) -> RouterResult<PoolSnapshot> {
        let id: PoolId = self
            .id
            .parse()
            .map_err(|_| RouterError::Decode(format!("bad pool id: {}", self.id)))?;
        // percentage to basis points: 0.08% -> 8 bps
        let fee_bps = (self.fee * 100.0).round();
        if !(0.0..10_000.0).contains(&fee_bps) {
            return Err(RouterError::Decode(format!("bad pool fee: {}", self.fee)));
        }
        Ok(PoolSnapshot {
            id,
            asset0: AssetId::new(self.asset0),
            asset1: AssetId::new(self.asset1),
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            fee_bps: fee_bps as u16,
            total_supply: self.total_supply,
        })
    }
}

impl IndexerClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static");
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    async fn fetch_all(&self) -> RouterResult<Vec<PoolSnapshot>> {
        let url = format!("{}/api/v1/pools", self.endpoint);
        debug!(%url, "querying indexer for pools");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| RouterError::Indexer(err.to_string()))?;
        if !response.status().is_success() {
            return Err(RouterError::IndexerStatus(response.status().as_u16()));
        }
        let records: Vec<PoolRecord> = response
            .json()
            .await
            .map_err(|err| RouterError::Decode(err.to_string()))?;
        records.into_iter().map(PoolRecord::into_snapshot).collect()
    }
}

impl PoolDirectory for IndexerClient {
    async fn pool_by_id(&self, id: PoolId) -> RouterResult<Option<PoolSnapshot>> {
        let url = format!("{}/api/v1/pools/{}", self.endpoint, id);
        debug!(%url, "querying indexer for pool");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| RouterError::Indexer(err.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RouterError::IndexerStatus(response.status().as_u16()));
        }
        let record: PoolRecord = response
            .json()
            .await
            .map_err(|err| RouterError::Decode(err.to_string()))?;
        record.into_snapshot().map(Some)
    }

    async fn find_pool(&self, a: &AssetId, b: &AssetId) -> RouterResult<Option<PoolSnapshot>> {
        let pools = self.fetch_all().await?;
        Ok(pools.into_iter().find(|p| p.matches_pair(a, b)))
    }
}
