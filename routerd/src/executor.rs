//! Transaction sink boundary.
//!
//! The router never mutates pool state itself: validated instructions are
//! submitted to the ledger node, whose consensus serializes them. The
//! sink accepts a contract call and reports success or failure; nothing
//! more is assumed about it.

use std::future::Future;

use serde_json::json;
use tracing::info;

use crate::errors::{RouterError, RouterResult};

/// Contract-call submission boundary
pub trait DexExecutor {
    /// Submit one contract operation with its payload and await the
    /// ledger's accept/reject outcome.
    fn execute_operation(
        &self,
        operation: &str,
        payload: &str,
    ) -> impl Future<Output = RouterResult<()>> + Send;
}

/// Submits contract calls to a ledger node over HTTP
#[derive(Debug, Clone)]
pub struct LedgerSubmitter {
    endpoint: String,
    contract: String,
    client: reqwest::Client,
}

impl LedgerSubmitter {
    pub fn new(endpoint: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            contract: contract.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl DexExecutor for LedgerSubmitter {
    async fn execute_operation(&self, operation: &str, payload: &str) -> RouterResult<()> {
        let url = format!("{}/api/v1/contracts/call", self.endpoint);
        info!(contract = %self.contract, %operation, "submitting contract call");
        let body = json!({
            "contract": self.contract,
            "operation": operation,
            "payload": payload,
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| RouterError::Executor(err.to_string()))?;
        if !response.status().is_success() {
            return Err(RouterError::Executor(format!(
                "ledger returned status {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

/// Records submissions instead of sending them; for tests.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    submissions: std::sync::Mutex<Vec<(String, String)>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().expect("submission log poisoned").clone()
    }
}

impl DexExecutor for RecordingExecutor {
    async fn execute_operation(&self, operation: &str, payload: &str) -> RouterResult<()> {
        self.submissions
            .lock()
            .expect("submission log poisoned")
            .push((operation.to_string(), payload.to_string()));
        Ok(())
    }
}
