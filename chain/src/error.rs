use crate::codec::CodecError;
use crate::pow::PowError;
use crate::storage::StorageError;

/// Errors surfaced by chain-level operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The backing store could not be opened (inaccessible, locked).
    #[error("failed to open block store: {0}")]
    StorageOpen(#[source] StorageError),
    /// A read or write transaction failed; chain state is unchanged.
    #[error("storage transaction failed: {0}")]
    Transaction(#[source] StorageError),
    /// A well-formed block could not be encoded.
    #[error("failed to serialize block: {0}")]
    Serialization(#[source] CodecError),
    /// Stored bytes did not decode to a block.
    #[error("failed to deserialize block {key}: {source}")]
    Deserialization { key: String, source: CodecError },
    /// The stored chain is inconsistent (missing tip, dangling link, bad
    /// proof-of-work).
    #[error("chain integrity violated: {0}")]
    Integrity(String),
    /// Mining was cancelled or its worker failed.
    #[error("mining failed: {0}")]
    Mining(#[from] PowError),
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<StorageError> for ChainError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Encode(source) => ChainError::Serialization(source),
            StorageError::Decode { key, source } => ChainError::Deserialization { key, source },
            StorageError::CorruptedTip(e) => ChainError::Integrity(format!("tip entry: {e}")),
            other => ChainError::Transaction(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_onto_taxonomy() {
        let e: ChainError = StorageError::Injected("commit").into();
        assert!(matches!(e, ChainError::Transaction(_)));

        let bad = crate::types::BlockHash::from_hex("zz").expect_err("invalid hex");
        let e: ChainError = StorageError::CorruptedTip(bad).into();
        assert!(matches!(e, ChainError::Integrity(_)));

        let decode = crate::codec::decode_block(&[]).expect_err("empty input");
        let e: ChainError = StorageError::Decode {
            key: "k".to_string(),
            source: decode,
        }
        .into();
        assert!(matches!(e, ChainError::Deserialization { .. }));
    }

    #[test]
    fn display_includes_cause() {
        let e = ChainError::Transaction(StorageError::Injected("commit"));
        assert_eq!(
            e.to_string(),
            "storage transaction failed: injected storage failure: commit"
        );
    }
}
