//! Error types for ledger validation

use thiserror::Error;

use crate::types::{Hash, Integer, Natural, OutPoint};

/// Why a single transaction was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Referenced output not found: {0:?}")]
    MissingOutput(OutPoint),

    #[error("Output claimed more than once: {0:?}")]
    DoubleSpend(OutPoint),

    #[error("Invalid signature on input {index}")]
    BadSignature { index: usize },

    #[error("Negative value {value} at output {index}")]
    NegativeOutputValue { index: usize, value: Integer },

    #[error("Inputs ({inputs}) less than outputs ({outputs})")]
    ValueConservationViolation { inputs: Integer, outputs: Integer },

    #[error("Cyclic dependency within batch")]
    CyclicDependency,

    #[error("Value sum overflow")]
    ValueOverflow,

    #[error("Malformed transaction: {0}")]
    Malformed(String),
}

/// Why a block was rejected by the chain index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Block declares no parent")]
    MissingParent,

    #[error("Parent block not retained: {}", hex(.0))]
    UnknownParent(Hash),

    #[error("Parent at height {parent_height} is too far below max height {max_height}")]
    ParentTooOld {
        parent_height: Natural,
        max_height: Natural,
    },

    #[error("Block already recorded: {}", hex(.0))]
    DuplicateBlock(Hash),

    #[error("Only {accepted} of {total} transactions valid")]
    InvalidTransactionSet { accepted: usize, total: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Transaction validation failed: {0}")]
    TransactionValidation(#[from] TransactionError),

    #[error("Block validation failed: {0}")]
    BlockValidation(#[from] BlockError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Lowercase hex rendering for hashes in messages and logs
pub(crate) fn hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        hash[31] = 0x01;
        let rendered = hex(&hash);
        assert_eq!(rendered.len(), 64);
        assert!(rendered.starts_with("ab00"));
        assert!(rendered.ends_with("01"));
    }

    #[test]
    fn test_error_conversion() {
        let err: ConsensusError = BlockError::MissingParent.into();
        assert!(matches!(err, ConsensusError::BlockValidation(BlockError::MissingParent)));
        assert_eq!(err.to_string(), "Block validation failed: Block declares no parent");
    }
}
