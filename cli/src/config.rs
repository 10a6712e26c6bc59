//! CLI configuration.
//!
//! The chain configuration starts from `powchain::ChainConfig::default()`
//! and is overridden by whatever global flags were given.

use powchain::ChainConfig;

use crate::args::GlobalArgs;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "powchain=info,powchain_cli=info";

/// Applies command-line overrides on top of the default chain config.
pub fn chain_config(args: &GlobalArgs) -> ChainConfig {
    let mut cfg = ChainConfig::default();
    if let Some(path) = &args.db_path {
        cfg.storage.path = path.clone();
    }
    if let Some(namespace) = &args.namespace {
        cfg.storage.namespace = namespace.clone();
    }
    if let Some(bits) = args.target_bits {
        cfg.pow.target_bits = bits;
    }
    cfg
}
