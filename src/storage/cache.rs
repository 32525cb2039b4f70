//! Sharded Cache
//!
//! The cache is a fixed array of [`Shard`]s. A key's shard is chosen by
//! hashing the key bytes and masking with `shard_count - 1`, which is why
//! the shard count must be a power of two: routing is one multiply-free
//! bitwise AND and the hash's low bits spread keys uniformly.
//!
//! The cache itself holds no lock. Every operation forwards to exactly one
//! shard, so operations on keys in different shards run fully in parallel
//! and per-key linearisability comes from the shard mutex alone.

use crate::storage::shard::Shard;
use bytes::Bytes;

/// Shard count used when the configured value is not a positive power of two.
pub const DEFAULT_SHARD_COUNT: usize = 256;

/// Per-shard capacity used by [`CacheConfig::default`]. 0 means unbounded.
pub const DEFAULT_MAX_ITEMS_PER_SHARD: usize = 1024;

/// Cache construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of shards; must be a positive power of two. Anything else
    /// falls back to [`DEFAULT_SHARD_COUNT`].
    pub shard_count: usize,
    /// Capacity bound per shard; 0 means unbounded.
    pub max_items_per_shard: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            max_items_per_shard: DEFAULT_MAX_ITEMS_PER_SHARD,
        }
    }
}

/// A sharded in-memory key-value cache with per-shard LRU eviction.
///
/// Designed to be wrapped in an `Arc` and shared across connection tasks.
///
/// # Example
///
/// ```
/// use voltkv::storage::Cache;
/// use bytes::Bytes;
///
/// let cache = Cache::new();
/// cache.set(Bytes::from("name"), Bytes::from("volt"));
/// assert_eq!(cache.get(b"name"), Some(Bytes::from("volt")));
/// cache.delete(b"name");
/// assert_eq!(cache.get(b"name"), None);
/// ```
#[derive(Debug)]
pub struct Cache {
    shards: Vec<Shard>,
    shard_mask: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Creates a cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache from an explicit configuration.
    ///
    /// Coercions are permissive: a `shard_count` that is zero or not a power
    /// of two falls back to the default rather than failing. All shards are
    /// allocated eagerly.
    pub fn with_config(config: CacheConfig) -> Self {
        let shard_count = if config.shard_count == 0 || !config.shard_count.is_power_of_two() {
            DEFAULT_SHARD_COUNT
        } else {
            config.shard_count
        };

        let shards = (0..shard_count)
            .map(|_| Shard::new(config.max_items_per_shard))
            .collect();

        Self {
            shards,
            shard_mask: (shard_count - 1) as u64,
        }
    }

    /// The shard a key routes to. Deterministic for a fixed shard count.
    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        (fnv1a(key) & self.shard_mask) as usize
    }

    #[inline]
    fn shard_for(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Looks up a key, promoting it within its shard on a hit.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.shard_for(key).get(key)
    }

    /// Inserts or replaces a key.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.shard_for(&key).set(key, value);
    }

    /// Removes a key. Removing an absent key is a no-op.
    pub fn delete(&self, key: &[u8]) {
        self.shard_for(key).delete(key);
    }

    /// Total entries across all shards.
    ///
    /// Shards are sampled one at a time, so the sum is a snapshot that may
    /// never have existed at any single instant. Introspection only.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    /// Number of shards the cache was built with.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

/// FNV-1a 64-bit hash.
///
/// Stable across runs and platforms; the wire protocol does not depend on
/// it, so it can be swapped for any well-distributed 64-bit hash without
/// breaking clients.
#[inline]
fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET_BASIS;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
