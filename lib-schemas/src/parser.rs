//! Instruction parsers.
//!
//! Instructions reach the system three ways: JSON documents (custom
//! operations and API calls), URL-query encoded memo strings, and memo
//! strings that may be either. All paths converge on
//! [`InstructionEnvelope::classify`] for validation.

use serde_json::{Map, Value};
use url::form_urlencoded;

use lib_types::{Account, AssetId};

use crate::errors::{SchemaError, SchemaResult};
use crate::types::{Instruction, InstructionEnvelope, ReturnAddress};

/// Parse an instruction from JSON bytes.
pub fn parse_json(data: &[u8]) -> SchemaResult<Instruction> {
    let envelope: InstructionEnvelope =
        serde_json::from_slice(data).map_err(|err| SchemaError::InvalidJson(err.to_string()))?;
    envelope.classify()
}

/// Parse an instruction from URL query parameters.
///
/// `metadata` may be supplied as a JSON-object string; `return_address`
/// uses the dotted keys `return_address.chain` / `return_address.address`.
pub fn parse_query(query: &str) -> SchemaResult<Instruction> {
    let mut envelope = InstructionEnvelope::default();
    let mut return_chain = None;
    let mut return_address = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = value.into_owned();
        match key.as_ref() {
            "type" => envelope.kind = Some(value),
            "version" => envelope.version = Some(value),
            "asset_in" => envelope.asset_in = Some(AssetId::new(value)),
            "asset_out" => envelope.asset_out = Some(AssetId::new(value)),
            "recipient" => envelope.recipient = Some(Account::new(value)),
            "slippage_bps" => envelope.slippage_bps = Some(parse_number(&value, "slippage_bps")?),
            "min_amount_out" => {
                envelope.min_amount_out = Some(parse_number(&value, "min_amount_out")?)
            }
            "beneficiary" => envelope.beneficiary = Some(Account::new(value)),
            "ref_bps" => envelope.ref_bps = Some(parse_number(&value, "ref_bps")?),
            "return_address.chain" => return_chain = Some(value),
            "return_address.address" => return_address = Some(value),
            "metadata" => {
                let parsed: Map<String, Value> = serde_json::from_str(&value)
                    .map_err(|err| SchemaError::InvalidQuery(format!("metadata: {err}")))?;
                envelope.metadata = Some(parsed);
            }
            _ => {} // unknown keys are ignored, matching the JSON schema
        }
    }

    if let (Some(chain), Some(address)) = (return_chain, return_address) {
        envelope.return_address = Some(ReturnAddress { chain, address });
    }
    envelope.classify()
}

/// Parse an instruction from a transaction memo.
///
/// Tries JSON first, then falls back to URL query parameters.
pub fn parse_memo(memo: &str) -> SchemaResult<Instruction> {
    let memo = memo.trim();
    if memo.starts_with('{') && memo.ends_with('}') {
        return parse_json(memo.as_bytes());
    }
    parse_query(memo)
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &'static str) -> SchemaResult<T> {
    value
        .parse()
        .map_err(|_| SchemaError::InvalidQuery(format!("{field} must be a number")))
}
