//! Asset custody boundary.
//!
//! The engine never moves funds itself: deposits are pulled from and
//! payouts pushed to an external asset-transfer collaborator. The trait
//! below is that boundary. Implementations must apply each call atomically
//! within the surrounding instruction.

use std::cell::RefCell;
use std::collections::BTreeMap;

use lib_types::{Account, Amount, AssetId};
use thiserror::Error;

/// Error from the asset custody collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("insufficient funds: {account} has {have} {asset}, needs {need}")]
    InsufficientFunds {
        account: Account,
        asset: AssetId,
        have: Amount,
        need: Amount,
    },

    #[error("custody unavailable: {0}")]
    Unavailable(String),
}

/// Result type for custody operations
pub type CustodyResult<T> = Result<T, CustodyError>;

/// External asset-transfer collaborator
pub trait AssetCustody {
    /// Pull `amount` of `asset` from `from` into pool custody
    fn draw(&self, from: &Account, asset: &AssetId, amount: Amount) -> CustodyResult<()>;

    /// Pay `amount` of `asset` out of pool custody to `to`
    fn transfer(&self, to: &Account, asset: &AssetId, amount: Amount) -> CustodyResult<()>;
}

/// In-memory custody ledger for tests and embedded use.
///
/// Tracks per-account balances plus the pool custody total per asset, so
/// tests can assert conservation across draws and payouts.
#[derive(Debug, Default)]
pub struct MemoryCustody {
    balances: RefCell<BTreeMap<(Account, AssetId), Amount>>,
    vault: RefCell<BTreeMap<AssetId, Amount>>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance
    pub fn set_balance(&self, account: impl Into<Account>, asset: impl Into<AssetId>, amount: Amount) {
        self.balances
            .borrow_mut()
            .insert((account.into(), asset.into()), amount);
    }

    pub fn balance(&self, account: &Account, asset: &AssetId) -> Amount {
        self.balances
            .borrow()
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Total held in pool custody for an asset
    pub fn vault_balance(&self, asset: &AssetId) -> Amount {
        self.vault.borrow().get(asset).copied().unwrap_or(0)
    }
}

impl AssetCustody for MemoryCustody {
    fn draw(&self, from: &Account, asset: &AssetId, amount: Amount) -> CustodyResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let mut balances = self.balances.borrow_mut();
        let key = (from.clone(), asset.clone());
        let have = balances.get(&key).copied().unwrap_or(0);
        if have < amount {
            return Err(CustodyError::InsufficientFunds {
                account: from.clone(),
                asset: asset.clone(),
                have,
                need: amount,
            });
        }
        balances.insert(key, have - amount);
        *self.vault.borrow_mut().entry(asset.clone()).or_insert(0) += amount;
        Ok(())
    }

    fn transfer(&self, to: &Account, asset: &AssetId, amount: Amount) -> CustodyResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let mut vault = self.vault.borrow_mut();
        let held = vault.get(asset).copied().unwrap_or(0);
        if held < amount {
            return Err(CustodyError::InsufficientFunds {
                account: Account::new("custody:vault"),
                asset: asset.clone(),
                have: held,
                need: amount,
            });
        }
        vault.insert(asset.clone(), held - amount);
        *self
            .balances
            .borrow_mut()
            .entry((to.clone(), asset.clone()))
            .or_insert(0) += amount;
        Ok(())
    }
}
