//! DEX routing service.
//!
//! Runs outside the ledger: discovers pools through the indexer read
//! model, projects routes with the engine's arithmetic, and submits
//! validated instructions to the ledger node. It holds no lock over pool
//! state; each submitted instruction is atomic on the ledger side, and
//! local reads are treated as potentially stale.

pub mod config;
pub mod directory;
pub mod errors;
pub mod executor;
pub mod indexer;
pub mod server;
pub mod service;

pub use config::{parse_cli_args, RouterdConfig};
pub use directory::{InMemoryDirectory, PoolDirectory, PoolSnapshot};
pub use errors::{RouterError, RouterResult};
pub use executor::{DexExecutor, LedgerSubmitter, RecordingExecutor};
pub use indexer::IndexerClient;
pub use server::{build_router, serve};
pub use service::{RouteQuery, RouterService};
