//! Block serialization codec.
//!
//! Serialization is done with **bincode 2** using the `serde` integration
//! and an explicit `standard()` config. The same encoding is used by every
//! storage backend, so a block written by one can be read by another.

use crate::types::Block;

/// Codec failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode block: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode block: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// The bytes held a complete block followed by extra data.
    #[error("failed to decode block: {trailing} trailing bytes")]
    TrailingBytes { trailing: usize },
}

/// Encodes a block into its storage bytes.
pub fn encode_block(block: &Block) -> Result<Vec<u8>, CodecError> {
    // Explicit config to avoid relying on any implicit defaults.
    let cfg = bincode::config::standard();
    Ok(bincode::serde::encode_to_vec(block, cfg)?)
}

/// Decodes a block from storage bytes.
///
/// The whole slice must be consumed; truncated or padded input is an
/// error, never a partially populated block.
pub fn decode_block(bytes: &[u8]) -> Result<Block, CodecError> {
    let cfg = bincode::config::standard();
    let (block, read): (Block, usize) = bincode::serde::decode_from_slice(bytes, cfg)?;
    if read != bytes.len() {
        return Err(CodecError::TrailingBytes {
            trailing: bytes.len() - read,
        });
    }
    Ok(block)
}
