//! Structured logging setup and per-operation log context

use crate::pda::{CacheStats, DerivedAddress};
use solana_sdk::pubkey::Pubkey;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level` when set. Calling this twice is an error
/// from `tracing-subscriber`, which is surfaced rather than ignored.
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }
    Ok(())
}

/// Structured logger for derivation and cache events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
}

impl StructuredLogger {
    pub fn new(context_id: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
        }
    }

    /// Logger with a fresh random context id
    pub fn with_random_context() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_derivation(&self, program_id: &Pubkey, derived: &DerivedAddress) {
        tracing::info!(
            context_id = %self.context_id,
            program_id = %program_id,
            address = %derived.address,
            bump = derived.bump,
            "Program address derived"
        );
    }

    pub fn log_cache_stats(&self, stats: &CacheStats) {
        tracing::debug!(
            context_id = %self.context_id,
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            size = stats.size,
            hit_rate = %format!("{:.3}", stats.hit_rate()),
            "Address cache stats"
        );
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            context_id = %self.context_id,
            message = %message,
            "Error"
        );
    }
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::with_random_context()
    }
}
