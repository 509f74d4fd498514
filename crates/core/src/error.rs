//! Error taxonomy shared by the tree, block and record layers.

use crate::pow::MiningError;
use crate::transaction::TransactionError;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Invalid construction parameters. Not recoverable locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{0} is not a valid hash function")]
    UnknownHashFunction(String),

    #[error("{0} is not a supported signature scheme")]
    UnknownSignatureScheme(String),

    #[error("no leaves to be hashed")]
    EmptyLeafSet,

    #[error("left and right branch not balanced (left height {left}, right height {right})")]
    UnbalancedCombiner { left: usize, right: usize },

    #[error("hash functions incompatible (expected {expected}, found {found})")]
    HashFunctionMismatch { expected: String, found: String },

    #[error("difficulty {difficulty} needs {required} zero bits but the digest only has {available}")]
    DifficultyTooHigh {
        difficulty: u32,
        required: usize,
        available: usize,
    },
}

/// A stored or transmitted value does not match what its content recomputes to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("{entity} digest mismatch (stored {stored}, computed {computed})")]
    DigestMismatch {
        entity: &'static str,
        stored: String,
        computed: String,
    },

    #[error("merkle tree height mismatch (stored {stored}, computed {computed})")]
    HeightMismatch { stored: usize, computed: usize },

    #[error("malformed {entity} record: {reason}")]
    MalformedRecord {
        entity: &'static str,
        reason: String,
    },
}

impl IntegrityError {
    pub(crate) fn malformed(entity: &'static str, reason: impl ToString) -> Self {
        IntegrityError::MalformedRecord {
            entity,
            reason: reason.to_string(),
        }
    }
}

/// Top-level error for ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("mining stopped: {0}")]
    Mining(#[from] MiningError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Decode a JSON record.
///
/// Text that is not JSON is a serialization error. JSON that does not have
/// the record's shape (wrong types, missing or extra fields) is a malformed
/// `entity` record.
pub(crate) fn decode_record<T: DeserializeOwned>(entity: &'static str, json: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    serde_json::from_value(value).map_err(|e| IntegrityError::malformed(entity, e).into())
}

