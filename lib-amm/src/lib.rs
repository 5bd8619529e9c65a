//! Constant-product pool engine.
//!
//! The ledger side of the mapped-asset DEX: pool records, liquidity
//! claims, swap execution and route planning, behind a contract-level
//! operation surface.
//!
//! # Key Types
//!
//! - [`DexState`]: the explicit pool ledger (no ambient storage)
//! - [`DexContract`]: contract operations over state plus custody
//! - [`AssetCustody`]: the external asset-transfer boundary
//! - [`SwapResult`]: structured route outcome with a success flag
//!
//! # Execution model
//!
//! Operations are deterministic, synchronous state transitions: one
//! instruction completes fully before the next begins. Every operation
//! validates before its first write; swap plans are computed read-only
//! and committed only after all checks (including both legs of a two-hop
//! route) have passed.

pub mod contract;
pub mod custody;
pub mod errors;
pub mod liquidity;
pub mod math;
pub mod routing;
pub mod state;
pub mod swap;

pub use contract::{ContractError, DexContract, ExecutionOutcome, PoolInfo};
pub use custody::{AssetCustody, CustodyError, MemoryCustody};
pub use errors::{AmmError, AmmResult};
pub use routing::{execute_route, RouteHop, RouteRequest, SwapResult};
pub use state::{CallContext, DexParams, DexState, Direction, Pool, DEFAULT_BASE_FEE_BPS};
pub use swap::{plan_swap, quote, swap, Referral, SwapOutcome, SwapPlan};
