//! Instruction schema types.
//!
//! The wire document is decoded into [`InstructionEnvelope`] (every field
//! optional, matching the shared schema across instruction kinds), then
//! validated and classified into the closed [`Instruction`] enum.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use lib_types::{Account, Amount, AssetId, Bps, MAX_BPS};

use crate::errors::{SchemaError, SchemaResult};

/// Default slippage tolerance when the instruction does not set one
pub const DEFAULT_SLIPPAGE_BPS: Bps = 50;

/// Return address for bridged withdrawals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnAddress {
    pub chain: String,
    pub address: String,
}

/// The raw wire document.
///
/// All fields are optional here; required-field enforcement happens in
/// [`InstructionEnvelope::classify`] so a missing field reports a schema
/// error instead of a serde error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstructionEnvelope {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub version: Option<String>,
    pub asset_in: Option<AssetId>,
    pub asset_out: Option<AssetId>,
    pub recipient: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount_out: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beneficiary: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_bps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_address: Option<ReturnAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// A validated swap instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapInstruction {
    pub version: String,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub recipient: Account,
    pub slippage_bps: Bps,
    pub min_amount_out: Amount,
    pub beneficiary: Option<Account>,
    pub ref_bps: Option<Bps>,
    pub return_address: Option<ReturnAddress>,
}

/// A validated liquidity deposit instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositInstruction {
    pub version: String,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub recipient: Account,
    pub amount0: Amount,
    pub amount1: Amount,
}

/// A validated liquidity withdrawal instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalInstruction {
    pub version: String,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub recipient: Account,
    pub lp_amount: Amount,
}

/// The closed set of instruction kinds.
///
/// Adding a kind is a compile-time-enforced change everywhere
/// instructions are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Swap(SwapInstruction),
    Deposit(DepositInstruction),
    Withdrawal(WithdrawalInstruction),
}

impl InstructionEnvelope {
    /// Validate required fields and bounds, then classify by kind.
    pub fn classify(self) -> SchemaResult<Instruction> {
        let kind = self.kind.as_deref().unwrap_or("");
        let version = self.version.clone().unwrap_or_default();
        let asset_in = self.asset_in.clone().unwrap_or_default();
        let asset_out = self.asset_out.clone().unwrap_or_default();
        let recipient = self.recipient.clone().unwrap_or_default();

        if kind.is_empty()
            || version.is_empty()
            || asset_in.is_empty()
            || asset_out.is_empty()
            || recipient.is_empty()
        {
            return Err(SchemaError::MissingRequired);
        }
        if asset_in == asset_out {
            return Err(SchemaError::IdenticalAssets);
        }

        let slippage_bps = match self.slippage_bps {
            None => DEFAULT_SLIPPAGE_BPS,
            Some(value) if value as u64 <= MAX_BPS as u64 => value as Bps,
            Some(value) => {
                return Err(SchemaError::OutOfRange {
                    field: "slippage_bps",
                    value: value as u64,
                    max: MAX_BPS as u64,
                })
            }
        };
        // The schema-level bound is looser than the engine's 1..=1000;
        // the engine bound is the authoritative one.
        let ref_bps = match self.ref_bps {
            None => None,
            Some(value) if value as u64 <= MAX_BPS as u64 => Some(value as Bps),
            Some(value) => {
                return Err(SchemaError::OutOfRange {
                    field: "ref_bps",
                    value: value as u64,
                    max: MAX_BPS as u64,
                })
            }
        };
        if self.beneficiary.is_some() != ref_bps.is_some() {
            return Err(SchemaError::IncompleteReferral);
        }

        match kind {
            "swap" => Ok(Instruction::Swap(SwapInstruction {
                version,
                asset_in,
                asset_out,
                recipient,
                slippage_bps,
                min_amount_out: self.min_amount_out.unwrap_or(0),
                beneficiary: self.beneficiary,
                ref_bps,
                return_address: self.return_address,
            })),
            "deposit" => Ok(Instruction::Deposit(DepositInstruction {
                version,
                asset_in,
                asset_out,
                recipient,
                amount0: metadata_amount(self.metadata.as_ref(), "amount0")?,
                amount1: metadata_amount(self.metadata.as_ref(), "amount1")?,
            })),
            "withdrawal" => Ok(Instruction::Withdrawal(WithdrawalInstruction {
                version,
                asset_in,
                asset_out,
                recipient,
                lp_amount: metadata_amount(self.metadata.as_ref(), "lp_amount")?,
            })),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }
}

/// Pull a required unsigned amount out of the metadata map.
fn metadata_amount(
    metadata: Option<&Map<String, Value>>,
    field: &'static str,
) -> SchemaResult<Amount> {
    let value = metadata
        .and_then(|m| m.get(field))
        .ok_or(SchemaError::MissingMetadata(field))?;
    value.as_u64().ok_or(SchemaError::InvalidMetadata(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(kind: &str) -> InstructionEnvelope {
        InstructionEnvelope {
            kind: Some(kind.to_string()),
            version: Some("1.0.0".to_string()),
            asset_in: Some(AssetId::new("BTC")),
            asset_out: Some(AssetId::new("USD")),
            recipient: Some(Account::new("ledger:alice")),
            ..Default::default()
        }
    }

    #[test]
    fn test_swap_defaults() {
        let instruction = envelope("swap").classify().unwrap();
        match instruction {
            Instruction::Swap(swap) => {
                assert_eq!(swap.slippage_bps, DEFAULT_SLIPPAGE_BPS);
                assert_eq!(swap.min_amount_out, 0);
                assert!(swap.beneficiary.is_none());
            }
            other => panic!("expected swap, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_fields() {
        for strip in 0..5 {
            let mut env = envelope("swap");
            match strip {
                0 => env.kind = None,
                1 => env.version = None,
                2 => env.asset_in = None,
                3 => env.asset_out = None,
                _ => env.recipient = None,
            }
            assert_eq!(env.classify().unwrap_err(), SchemaError::MissingRequired);
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = envelope("stake").classify().unwrap_err();
        assert_eq!(err, SchemaError::UnknownType("stake".to_string()));
    }

    #[test]
    fn test_identical_assets_rejected() {
        let mut env = envelope("swap");
        env.asset_out = Some(AssetId::new("btc"));
        assert_eq!(env.classify().unwrap_err(), SchemaError::IdenticalAssets);
    }

    #[test]
    fn test_slippage_bounds() {
        let mut env = envelope("swap");
        env.slippage_bps = Some(10_000);
        env.classify().unwrap();

        let mut env = envelope("swap");
        env.slippage_bps = Some(10_001);
        assert!(matches!(
            env.classify().unwrap_err(),
            SchemaError::OutOfRange { field: "slippage_bps", .. }
        ));
    }

    #[test]
    fn test_referral_fields_travel_together() {
        let mut env = envelope("swap");
        env.ref_bps = Some(100);
        assert_eq!(env.classify().unwrap_err(), SchemaError::IncompleteReferral);

        let mut env = envelope("swap");
        env.beneficiary = Some(Account::new("ledger:referrer"));
        assert_eq!(env.classify().unwrap_err(), SchemaError::IncompleteReferral);

        let mut env = envelope("swap");
        env.beneficiary = Some(Account::new("ledger:referrer"));
        env.ref_bps = Some(100);
        env.classify().unwrap();
    }

    #[test]
    fn test_schema_ref_bound_is_loose() {
        // 0 and 10000 pass the schema; the engine enforces 1..=1000
        for bps in [0u32, 10_000] {
            let mut env = envelope("swap");
            env.beneficiary = Some(Account::new("ledger:referrer"));
            env.ref_bps = Some(bps);
            env.classify().unwrap();
        }
        let mut env = envelope("swap");
        env.beneficiary = Some(Account::new("ledger:referrer"));
        env.ref_bps = Some(10_001);
        assert!(matches!(
            env.classify().unwrap_err(),
            SchemaError::OutOfRange { field: "ref_bps", .. }
        ));
    }

    #[test]
    fn test_deposit_amounts_from_metadata() {
        let mut env = envelope("deposit");
        let mut metadata = Map::new();
        metadata.insert("amount0".to_string(), json!(1_000_000));
        metadata.insert("amount1".to_string(), json!(500_000));
        env.metadata = Some(metadata);

        match env.classify().unwrap() {
            Instruction::Deposit(deposit) => {
                assert_eq!(deposit.amount0, 1_000_000);
                assert_eq!(deposit.amount1, 500_000);
            }
            other => panic!("expected deposit, got {:?}", other),
        }
    }

    #[test]
    fn test_deposit_missing_metadata() {
        let err = envelope("deposit").classify().unwrap_err();
        assert_eq!(err, SchemaError::MissingMetadata("amount0"));

        let mut env = envelope("deposit");
        let mut metadata = Map::new();
        metadata.insert("amount0".to_string(), json!(1_000));
        env.metadata = Some(metadata);
        assert_eq!(
            env.classify().unwrap_err(),
            SchemaError::MissingMetadata("amount1")
        );
    }

    #[test]
    fn test_deposit_non_integer_amount() {
        let mut env = envelope("deposit");
        let mut metadata = Map::new();
        metadata.insert("amount0".to_string(), json!("lots"));
        metadata.insert("amount1".to_string(), json!(1));
        env.metadata = Some(metadata);
        assert_eq!(
            env.classify().unwrap_err(),
            SchemaError::InvalidMetadata("amount0")
        );
    }

    #[test]
    fn test_withdrawal_lp_amount() {
        let mut env = envelope("withdrawal");
        let mut metadata = Map::new();
        metadata.insert("lp_amount".to_string(), json!(707_106));
        env.metadata = Some(metadata);

        match env.classify().unwrap() {
            Instruction::Withdrawal(withdrawal) => assert_eq!(withdrawal.lp_amount, 707_106),
            other => panic!("expected withdrawal, got {:?}", other),
        }
    }
}
