//! Prometheus-backed chain metrics.
//!
//! [`MetricsRegistry`] owns a Prometheus registry and a set of
//! strongly-typed chain metrics. There is no exporter: binaries render
//! the registry with [`MetricsRegistry::gather_text`] when they want it.

use prometheus::{self, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Chain-related Prometheus metrics, updated by
/// [`crate::chain::Blockchain::append`].
#[derive(Clone)]
pub struct ChainMetrics {
    /// Blocks committed to the store (genesis excluded).
    pub blocks_appended: IntCounter,
    /// Appends that failed at any stage.
    pub append_failures: IntCounter,
    /// Digests computed by the proof-of-work search.
    pub hash_attempts: IntCounter,
    /// Wall time of each successful proof-of-work search, in seconds.
    pub mining_seconds: Histogram,
}

impl ChainMetrics {
    /// Registers chain metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let blocks_appended = IntCounter::with_opts(Opts::new(
            "chain_blocks_appended_total",
            "Total number of blocks appended to the chain",
        ))?;
        registry.register(Box::new(blocks_appended.clone()))?;

        let append_failures = IntCounter::with_opts(Opts::new(
            "chain_append_failures_total",
            "Total number of failed append attempts",
        ))?;
        registry.register(Box::new(append_failures.clone()))?;

        let hash_attempts = IntCounter::with_opts(Opts::new(
            "chain_hash_attempts_total",
            "Total number of proof-of-work digests computed",
        ))?;
        registry.register(Box::new(hash_attempts.clone()))?;

        let mining_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "chain_mining_seconds",
                "Time to find a valid nonce for a block in seconds",
            )
            .buckets(vec![
                0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
            ]),
        )?;
        registry.register(Box::new(mining_seconds.clone()))?;

        Ok(Self {
            blocks_appended,
            append_failures,
            hash_attempts,
            mining_seconds,
        })
    }
}

/// Top-level metrics registry.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub chain: ChainMetrics,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let chain = ChainMetrics::register(&registry)?;
        Ok(Self { registry, chain })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
