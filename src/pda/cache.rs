//! Bounded LRU cache with TTL for derived addresses
//!
//! Combines:
//! - **LRU eviction**: the least recently used entry goes once the cache
//!   holds more than `max_size` entries
//! - **TTL expiry**: entries older than `ttl` are dropped on access or by
//!   [`AddressCache::cleanup_expired`]
//!
//! The cache is an explicit, caller-owned value. It takes `&mut self` and
//! performs no locking of its own; share it across threads through
//! [`super::CachedDeriver`] or an external mutex.

use super::engine::DerivedAddress;
use crate::metrics::metrics;
use solana_sdk::pubkey::Pubkey;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Time source for the cache
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests
#[cfg(any(test, feature = "test_utils"))]
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<parking_lot::Mutex<Duration>>,
}

#[cfg(any(test, feature = "test_utils"))]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(parking_lot::Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Deterministic identity of a derivation request
///
/// Rendered as `<program base58>/<seed hex>/<seed hex>...`. Seed boundaries
/// are part of the key, so `["ab", "c"]` and `["a", "bc"]` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<S: AsRef<[u8]>>(program_id: &Pubkey, seeds: &[S]) -> Self {
        let mut key = program_id.to_string();
        for seed in seeds {
            key.push('/');
            key.push_str(&hex::encode(seed.as_ref()));
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached derivation with its access bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub address: Pubkey,
    pub bump: u8,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    /// Position in the recency index
    tick: u64,
}

impl CacheEntry {
    pub fn derived(&self) -> DerivedAddress {
        DerivedAddress {
            address: self.address,
            bump: self.bump,
        }
    }
}

/// Cache counters for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Capacity evictions
    pub evictions: u64,
    /// Entries dropped for age
    pub expirations: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU + TTL cache of derived addresses
pub struct AddressCache {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Recency index: lowest tick = least recently used
    recency: BTreeMap<u64, CacheKey>,
    next_tick: u64,
    max_size: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl fmt::Debug for AddressCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressCache")
            .field("size", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats)
            .finish()
    }
}

impl AddressCache {
    /// Default capacity
    pub const DEFAULT_MAX_SIZE: usize = 1_000;
    /// Default time-to-live
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self::with_clock(max_size, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(max_size: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            max_size,
            ttl,
            clock,
            stats: CacheStats {
                max_size,
                ..CacheStats::default()
            },
        }
    }

    /// Look up a derivation, refreshing recency on hit
    ///
    /// An expired entry is evicted and reported as a miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<DerivedAddress> {
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            None => {
                self.record_miss();
                return None;
            }
            Some(entry) => now.saturating_duration_since(entry.created_at) > self.ttl,
        };

        if expired {
            self.remove(key);
            self.stats.expirations += 1;
            self.record_miss();
            trace!(key = %key, "cache entry expired");
            return None;
        }

        let tick = self.bump_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        entry.last_accessed = now;
        entry.access_count += 1;
        let derived = entry.derived();
        self.recency.insert(tick, key.clone());

        self.stats.hits += 1;
        metrics().pda_cache_hits.inc();
        Some(derived)
    }

    /// Look up without touching recency, counters or expiry
    pub fn peek(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Insert or replace a derivation as the most recently used entry
    pub fn put(&mut self, key: CacheKey, result: DerivedAddress) {
        let now = self.clock.now();
        let tick = self.bump_tick();

        if let Some(previous) = self.entries.remove(&key) {
            self.recency.remove(&previous.tick);
        }
        self.recency.insert(tick, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                address: result.address,
                bump: result.bump,
                created_at: now,
                last_accessed: now,
                access_count: 0,
                tick,
            },
        );

        while self.entries.len() > self.max_size {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            metrics().pda_cache_evictions.inc();
            trace!(key = %oldest, "evicted least recently used entry");
        }
        self.stats.size = self.entries.len();
    }

    /// Drop every entry older than the TTL; returns how many were removed
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let removed = self.retain(|entry| now.saturating_duration_since(entry.created_at) <= ttl);
        self.stats.expirations += removed as u64;
        removed
    }

    /// Drop every entry created before `cutoff`; returns how many were removed
    pub fn evict_older_than(&mut self, cutoff: Instant) -> usize {
        let removed = self.retain(|entry| entry.created_at >= cutoff);
        self.stats.evictions += removed as u64;
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.stats.size = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            ..self.stats
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn bump_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn record_miss(&mut self) {
        self.stats.misses += 1;
        metrics().pda_cache_misses.inc();
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        self.stats.size = self.entries.len();
        Some(entry)
    }

    fn retain<F>(&mut self, keep: F) -> usize
    where
        F: Fn(&CacheEntry) -> bool,
    {
        let doomed: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| !keep(entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }
}

impl Default for AddressCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SIZE, Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derived(n: u8) -> DerivedAddress {
        DerivedAddress {
            address: Pubkey::new_from_array([n; 32]),
            bump: n,
        }
    }

    fn key(n: u8) -> CacheKey {
        CacheKey::new(&Pubkey::default(), &[&[n]])
    }

    fn cache(max_size: usize, ttl_secs: u64) -> (AddressCache, ManualClock) {
        let clock = ManualClock::new();
        let cache =
            AddressCache::with_clock(max_size, Duration::from_secs(ttl_secs), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_key_respects_seed_boundaries() {
        let program = Pubkey::new_unique();
        let a = CacheKey::new(&program, &[b"ab".as_slice(), b"c".as_slice()]);
        let b = CacheKey::new(&program, &[b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
        assert_eq!(a, CacheKey::new(&program, &[b"ab".as_slice(), b"c".as_slice()]));
        assert!(a.as_str().starts_with(&program.to_string()));
    }

    #[test]
    fn test_miss_then_hit() {
        let (mut cache, _) = cache(10, 60);
        assert_eq!(cache.get(&key(1)), None);
        cache.put(key(1), derived(1));
        assert_eq!(cache.get(&key(1)), Some(derived(1)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_updates_access_bookkeeping() {
        let (mut cache, clock) = cache(10, 60);
        cache.put(key(1), derived(1));
        clock.advance(Duration::from_secs(5));
        cache.get(&key(1));
        cache.get(&key(1));

        let entry = cache.peek(&key(1)).unwrap();
        assert_eq!(entry.access_count, 2);
        assert_eq!(
            entry.last_accessed.duration_since(entry.created_at),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_lru_eviction_order() {
        let (mut cache, _) = cache(2, 60);
        cache.put(key(1), derived(1));
        cache.put(key(2), derived(2));
        // Touch 1 so 2 becomes least recently used
        assert!(cache.get(&key(1)).is_some());
        cache.put(key(3), derived(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&key(2)).is_none());
        assert!(cache.peek(&key(1)).is_some());
        assert!(cache.peek(&key(3)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replace_does_not_grow() {
        let (mut cache, _) = cache(2, 60);
        cache.put(key(1), derived(1));
        cache.put(key(1), derived(9));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(1)), Some(derived(9)));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let (mut cache, clock) = cache(10, 30);
        cache.put(key(1), derived(1));
        clock.advance(Duration::from_secs(31));

        assert_eq!(cache.get(&key(1)), None);
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_entry_at_exact_ttl_is_still_valid() {
        let (mut cache, clock) = cache(10, 30);
        cache.put(key(1), derived(1));
        clock.advance(Duration::from_secs(30));
        assert!(cache.get(&key(1)).is_some());
    }

    #[test]
    fn test_cleanup_expired() {
        let (mut cache, clock) = cache(10, 30);
        cache.put(key(1), derived(1));
        clock.advance(Duration::from_secs(20));
        cache.put(key(2), derived(2));
        clock.advance(Duration::from_secs(15));

        assert_eq!(cache.cleanup_expired(), 1);
        assert!(cache.peek(&key(1)).is_none());
        assert!(cache.peek(&key(2)).is_some());
    }

    #[test]
    fn test_evict_older_than() {
        let (mut cache, clock) = cache(10, 3600);
        cache.put(key(1), derived(1));
        clock.advance(Duration::from_secs(10));
        let cutoff = clock.now();
        cache.put(key(2), derived(2));

        assert_eq!(cache.evict_older_than(cutoff), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&key(2)).is_some());

        // Recency index stays consistent after bulk removal
        cache.put(key(3), derived(3));
        cache.put(key(4), derived(4));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let (mut cache, _) = cache(0, 60);
        cache.put(key(1), derived(1));
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key(1)), None);
    }

    #[test]
    fn test_clear() {
        let (mut cache, _) = cache(4, 60);
        cache.put(key(1), derived(1));
        cache.put(key(2), derived(2));
        cache.clear();
        assert!(cache.is_empty());
        cache.put(key(3), derived(3));
        assert_eq!(cache.len(), 1);
    }
}
