//! Top-level configuration for a chain.
//!
//! This module aggregates configuration for:
//!
//! - storage (sled path and namespace),
//! - proof-of-work difficulty.
//!
//! The goal is to have a single `ChainConfig` struct that binaries can
//! construct from defaults and command-line overrides.

use crate::pow::{PowError, ProofOfWork, TARGET_BITS};
use crate::storage::SledConfig;

/// Proof-of-work parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PowConfig {
    /// Number of leading zero bits a block hash must have.
    ///
    /// Every block on a chain must be mined and validated with the same
    /// value, since it is part of the hash preimage.
    pub target_bits: u32,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            target_bits: TARGET_BITS,
        }
    }
}

impl PowConfig {
    /// Builds the engine described by this config.
    pub fn build(&self) -> Result<ProofOfWork, PowError> {
        ProofOfWork::new(self.target_bits)
    }
}

/// Top-level configuration for a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainConfig {
    pub storage: SledConfig,
    pub pow: PowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_layout() {
        let cfg = ChainConfig::default();
        assert_eq!(cfg.storage.path, "blockchain.db");
        assert_eq!(cfg.storage.namespace, "blocks");
        assert_eq!(cfg.pow.target_bits, 24);
    }

    #[test]
    fn pow_config_validates_bits() {
        assert!(PowConfig { target_bits: 0 }.build().is_err());
        assert_eq!(
            PowConfig::default().build().expect("valid").target_bits(),
            TARGET_BITS
        );
    }
}
