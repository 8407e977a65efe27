//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Derivation counters
    pub pda_derivations_total: IntCounter,
    pub pda_derivation_failures: IntCounter,

    // Cache counters
    pub pda_cache_hits: IntCounter,
    pub pda_cache_misses: IntCounter,
    pub pda_cache_evictions: IntCounter,

    // Transaction counters
    pub messages_compiled: IntCounter,
    pub transactions_serialized: IntCounter,
    pub signatures_attached: IntCounter,

    /// Errors by `category()`
    pub errors_total: IntCounterVec,

    // Histograms
    pub pda_bump_attempts: Histogram,
    pub compile_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let pda_derivations_total = IntCounter::with_opts(Opts::new(
            "pda_derivations_total",
            "Number of successful program address searches",
        ))?;

        let pda_derivation_failures = IntCounter::with_opts(Opts::new(
            "pda_derivation_failures",
            "Derivations rejected because the result was on the curve",
        ))?;

        let pda_cache_hits =
            IntCounter::with_opts(Opts::new("pda_cache_hits", "Address cache hits"))?;

        let pda_cache_misses =
            IntCounter::with_opts(Opts::new("pda_cache_misses", "Address cache misses"))?;

        let pda_cache_evictions = IntCounter::with_opts(Opts::new(
            "pda_cache_evictions",
            "Address cache entries evicted by capacity",
        ))?;

        let messages_compiled = IntCounter::with_opts(Opts::new(
            "messages_compiled",
            "Number of transaction messages compiled",
        ))?;

        let transactions_serialized = IntCounter::with_opts(Opts::new(
            "transactions_serialized",
            "Number of signed transactions serialized to wire bytes",
        ))?;

        let signatures_attached = IntCounter::with_opts(Opts::new(
            "signatures_attached",
            "Signatures added to transactions",
        ))?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Errors by category"),
            &["category"],
        )?;

        // 1 means the first bump (255) was accepted
        let pda_bump_attempts = Histogram::with_opts(
            HistogramOpts::new("pda_bump_attempts", "Bump candidates hashed per derivation")
                .buckets(vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 16.0, 64.0, 256.0]),
        )?;

        let compile_latency = Histogram::with_opts(
            HistogramOpts::new("compile_latency_seconds", "Message compilation latency")
                .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005]),
        )?;

        // Register all metrics
        registry.register(Box::new(pda_derivations_total.clone()))?;
        registry.register(Box::new(pda_derivation_failures.clone()))?;
        registry.register(Box::new(pda_cache_hits.clone()))?;
        registry.register(Box::new(pda_cache_misses.clone()))?;
        registry.register(Box::new(pda_cache_evictions.clone()))?;
        registry.register(Box::new(messages_compiled.clone()))?;
        registry.register(Box::new(transactions_serialized.clone()))?;
        registry.register(Box::new(signatures_attached.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(pda_bump_attempts.clone()))?;
        registry.register(Box::new(compile_latency.clone()))?;

        Ok(Self {
            registry,
            pda_derivations_total,
            pda_derivation_failures,
            pda_cache_hits,
            pda_cache_misses,
            pda_cache_evictions,
            messages_compiled,
            transactions_serialized,
            signatures_attached,
            errors_total,
            pda_bump_attempts,
            compile_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Count an error under its category label
    pub fn record_error(&self, category: &str) {
        self.errors_total.with_label_values(&[category]).inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
///
/// Registration only fails on duplicate names, which a fresh registry cannot
/// produce.
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
