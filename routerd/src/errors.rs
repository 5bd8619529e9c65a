//! Routing service errors

use lib_amm::AmmError;
use lib_schemas::SchemaError;
use thiserror::Error;

/// Error during route computation or instruction handling
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("indexer request failed: {0}")]
    Indexer(String),

    #[error("indexer returned status {0}")]
    IndexerStatus(u16),

    #[error("failed to decode pool response: {0}")]
    Decode(String),

    #[error("transaction submission failed: {0}")]
    Executor(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Amm(#[from] AmmError),
}

/// Result type for routing service operations
pub type RouterResult<T> = Result<T, RouterError>;
