//! DEX Instruction Schema
//!
//! This crate defines the external instruction schema and its validation.
//!
//! Instructions arrive as versioned JSON documents (from transaction
//! memos, custom operations, or direct API calls) and decode into a
//! closed [`Instruction`] enum, so dispatch over instruction kinds is
//! exhaustive at compile time.
//!
//! # Key Types
//!
//! - [`InstructionEnvelope`]: the raw wire document
//! - [`Instruction`]: the validated, classified instruction
//! - [`SchemaError`]: validation failures
//!
//! # Parsing
//!
//! Use [`parse_json`] for JSON payloads and [`parse_memo`] for memo
//! strings, which may be JSON or URL-query encoded.

pub mod errors;
pub mod parser;
pub mod types;

pub use errors::{SchemaError, SchemaResult};
pub use parser::{parse_json, parse_memo, parse_query};
pub use types::{
    DepositInstruction, Instruction, InstructionEnvelope, ReturnAddress, SwapInstruction,
    WithdrawalInstruction, DEFAULT_SLIPPAGE_BPS,
};
