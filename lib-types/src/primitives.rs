//! Canonical primitive types for the pegdex state machine.
//!
//! These types are the foundational building blocks for all engine-facing
//! data structures. They are designed to be:
//! - Deterministically serializable
//! - Cheap to clone and compare
//! - Free of behavior beyond construction and display
//!
//! Asset and account identifiers are symbolic strings because they name
//! externally-mapped assets ("BTC", "USD") and ledger accounts; the engine
//! normalizes asset symbols to uppercase at construction so pair lookups
//! are case-stable.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Asset quantities in the asset's smallest unit.
///
/// 64-bit on purpose: every product of two amounts goes through u128
/// intermediates in `lib-amm::math` before narrowing back.
pub type Amount = u64;

/// Basis points for percentage calculations (10000 = 100%)
pub type Bps = u16;

/// Sequentially assigned pool identifier (first pool is 1)
pub type PoolId = u64;

/// Maximum basis points (100%)
pub const MAX_BPS: Bps = 10_000;

// ============================================================================
// IDENTIFIER TYPES
// ============================================================================

/// Symbolic asset identifier, e.g. "BTC" or "USD".
///
/// Normalized to uppercase on construction, including deserialization.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Create a new AssetId, normalizing to uppercase
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_ascii_uppercase())
    }

    /// Get the underlying symbol
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the symbol is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Ledger account identifier, e.g. "ledger:alice" or "system:fees".
///
/// Opaque to the engine; case is preserved.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    /// Create a new Account
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identifier is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// System accounts live in the "system:" domain
    pub fn is_system(&self) -> bool {
        self.0.starts_with("system:")
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", self.0)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Account {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Account {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// TESTS
// ============================================================================
