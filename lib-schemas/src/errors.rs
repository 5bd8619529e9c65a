//! Instruction schema errors

use thiserror::Error;

/// Error during instruction parsing or validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid json payload: {0}")]
    InvalidJson(String),

    #[error("missing required fields")]
    MissingRequired,

    #[error("unknown instruction type: {0}")]
    UnknownType(String),

    #[error("asset_in and asset_out must differ")]
    IdenticalAssets,

    #[error("{field} out of range: {value} (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("beneficiary and ref_bps must be provided together")]
    IncompleteReferral,

    #[error("{0} required in metadata")]
    MissingMetadata(&'static str),

    #[error("{0} must be an unsigned integer")]
    InvalidMetadata(&'static str),

    #[error("invalid query string: {0}")]
    InvalidQuery(String),
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
