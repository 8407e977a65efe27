//! Configuration module for wirekit
//!
//! Settings are loaded from a TOML file, optionally overridden by
//! environment variables (a `.env` file is honoured), and validated before
//! use. Every section and field has a default, so an empty file is valid.

use crate::pda::{AddressCache, AddressDerivationEngine, CachedDeriver, CurvePolicy, SeedLimits};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Derived-address cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Derivation policy and seed limits
    #[serde(default)]
    pub derivation: DerivationConfig,

    /// Log level and output format
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached derivations
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,

    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationConfig {
    /// `high_bit` or `ed25519`
    #[serde(default)]
    pub curve_policy: CurvePolicy,

    /// Overrides for the protocol seed limits
    #[serde(default)]
    pub limits: Option<SeedLimits>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `wirekit=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_cache_max_size() -> usize { 10_000 }
fn default_cache_ttl_secs() -> u64 { 300 }
fn default_log_level() -> String { "info".to_string() }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

pub const ENV_CACHE_MAX_SIZE: &str = "WIREKIT_CACHE_MAX_SIZE";
pub const ENV_CACHE_TTL_SECS: &str = "WIREKIT_CACHE_TTL_SECS";
pub const ENV_LOG_LEVEL: &str = "WIREKIT_LOG_LEVEL";

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// [`Config::from_file_with_env`])
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CACHE_MAX_SIZE) {
            self.cache.max_size = raw
                .parse()
                .with_context(|| format!("{} must be an integer, got {:?}", ENV_CACHE_MAX_SIZE, raw))?;
        }
        if let Some(raw) = lookup(ENV_CACHE_TTL_SECS) {
            self.cache.ttl_secs = raw
                .parse()
                .with_context(|| format!("{} must be an integer, got {:?}", ENV_CACHE_TTL_SECS, raw))?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache.max_size == 0 {
            bail!("cache.max_size must be greater than 0");
        }
        if self.cache.ttl_secs == 0 {
            bail!("cache.ttl_secs must be greater than 0");
        }
        if let Some(limits) = &self.derivation.limits {
            if limits.max_seed_len == 0 || limits.max_seeds < 2 {
                bail!("derivation.limits must allow at least one non-empty seed plus the bump");
            }
            if limits.max_total_len < limits.max_seed_len {
                bail!(
                    "derivation.limits.max_total_len ({}) is below max_seed_len ({})",
                    limits.max_total_len,
                    limits.max_seed_len
                );
            }
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn engine(&self) -> AddressDerivationEngine {
        let engine = AddressDerivationEngine::new(self.derivation.curve_policy);
        match self.derivation.limits {
            Some(limits) => engine.with_limits(limits),
            None => engine,
        }
    }

    pub fn address_cache(&self) -> AddressCache {
        AddressCache::new(self.cache.max_size, self.cache_ttl())
    }

    pub fn cached_deriver(&self) -> CachedDeriver {
        CachedDeriver::new(self.engine(), self.address_cache())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache.max_size, 10_000);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.engine(), AddressDerivationEngine::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[cache]
max_size = 64

[derivation]
curve_policy = "ed25519"

[derivation.limits]
max_seed_len = 32
max_seeds = 8
max_total_len = 128

[logging]
level = "debug"
json = true
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.cache.max_size, 64);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.derivation.curve_policy, CurvePolicy::Ed25519);
        assert_eq!(config.engine().limits().max_seeds, 8);
        assert!(config.logging.json);
        assert_eq!(config.address_cache().max_size(), 64);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_CACHE_MAX_SIZE, "5"),
            (ENV_CACHE_TTL_SECS, "9"),
            (ENV_LOG_LEVEL, "wirekit=trace"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.cache.max_size, 5);
        assert_eq!(config.cache.ttl_secs, 9);
        assert_eq!(config.logging.level, "wirekit=trace");

        let err = config
            .apply_overrides(|key| (key == ENV_CACHE_TTL_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_TTL_SECS));
    }

    #[test]
    fn test_validation() {
        assert!(Config::from_toml("[cache]\nmax_size = 0").is_err());
        assert!(Config::from_toml("[cache]\nttl_secs = 0").is_err());
        assert!(Config::from_toml(
            "[derivation.limits]\nmax_seed_len = 32\nmax_seeds = 16\nmax_total_len = 8"
        )
        .is_err());
        assert!(Config::from_toml("[derivation]\ncurve_policy = \"square\"").is_err());
        assert!(Config::from_file("/nonexistent/wirekit.toml").is_err());
    }
}
