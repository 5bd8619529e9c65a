//! pegdex primitives.
//! Stable, protocol-neutral, behavior-free.

pub mod primitives;

pub use primitives::{Account, Amount, AssetId, Bps, PoolId, MAX_BPS};
