//! Program-derived addresses
//!
//! - **seeds**: the closed [`SeedValue`] union and its byte form
//! - **engine**: bump search, single-shot creation and validation
//! - **cache**: caller-owned LRU/TTL memoization of search results
//!
//! [`CachedDeriver`] ties the engine and a mutex-guarded cache together for
//! multi-threaded callers.

pub mod cache;
pub mod engine;
pub mod errors;
pub mod seeds;

pub use cache::{AddressCache, CacheEntry, CacheKey, CacheStats, Clock, SystemClock};
pub use engine::{AddressDerivationEngine, CurvePolicy, DerivedAddress, SeedLimits};
pub use errors::{DerivationError, DerivationResult};
pub use seeds::{Endianness, NumberWidth, SeedParseError, SeedValue};

#[cfg(any(test, feature = "test_utils"))]
pub use cache::ManualClock;

use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;

/// Marker appended to every derivation hash
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Per-seed byte limit
pub const MAX_SEED_LEN: usize = 32;

/// Seed count limit, bump included
pub const MAX_SEEDS: usize = 16;

/// Total seed bytes (bump excluded): every slot filled to the per-seed limit
pub const MAX_TOTAL_SEED_LEN: usize = MAX_SEED_LEN * MAX_SEEDS;

/// Derivation engine fronted by a shared cache
///
/// Cache access is serialized behind a mutex; the bump search itself runs
/// outside the lock, so concurrent misses on different keys do not block
/// each other. Two threads missing on the same key both derive and the
/// second `put` simply replaces an identical entry.
#[derive(Debug)]
pub struct CachedDeriver {
    engine: AddressDerivationEngine,
    cache: Mutex<AddressCache>,
}

impl CachedDeriver {
    pub fn new(engine: AddressDerivationEngine, cache: AddressCache) -> Self {
        Self {
            engine,
            cache: Mutex::new(cache),
        }
    }

    pub fn engine(&self) -> &AddressDerivationEngine {
        &self.engine
    }

    /// Cached [`AddressDerivationEngine::find_address`]
    pub fn find_address(&self, seeds: &[SeedValue], program_id: &Pubkey) -> DerivationResult<DerivedAddress> {
        let raw = self.engine.encode_seeds(seeds)?;
        let refs: Vec<&[u8]> = raw.iter().map(Vec::as_slice).collect();
        self.find_address_raw(&refs, program_id)
    }

    /// Cached [`AddressDerivationEngine::find_address_raw`]
    pub fn find_address_raw(&self, seeds: &[&[u8]], program_id: &Pubkey) -> DerivationResult<DerivedAddress> {
        let key = CacheKey::new(program_id, seeds);

        if let Some(hit) = self.cache.lock().get(&key) {
            return Ok(hit);
        }

        let derived = self.engine.find_address_raw(seeds, program_id)?;
        self.cache.lock().put(key, derived);
        Ok(derived)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn cleanup_expired(&self) -> usize {
        self.cache.lock().cleanup_expired()
    }

    /// Run `f` with exclusive access to the cache
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut AddressCache) -> R) -> R {
        f(&mut self.cache.lock())
    }
}

impl Default for CachedDeriver {
    fn default() -> Self {
        Self::new(AddressDerivationEngine::default(), AddressCache::default())
    }
}
