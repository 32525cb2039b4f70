//! Storage Module
//!
//! This module provides the in-memory store: a fixed array of shards, each
//! guarding its own slice of the key space with an independent mutex and
//! evicting least-recently-used entries once it hits its capacity bound.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Cache                              │
//! │        key ──► fnv1a(key) & mask ──► shard index            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │  ...N   │            │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ shards  │            │
//! │  │ map+LRU │ │ map+LRU │ │ map+LRU │ │         │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Shards never lock one another and no lock spans the whole cache, so
//! operations on different shards run in parallel. Within a shard even
//! `get` takes the exclusive lock, because a hit reorders the LRU list.
//!
//! ## Example
//!
//! ```
//! use voltkv::storage::{Cache, CacheConfig};
//! use bytes::Bytes;
//!
//! let cache = Cache::with_config(CacheConfig {
//!     shard_count: 64,
//!     max_items_per_shard: 1024,
//! });
//!
//! cache.set(Bytes::from("session"), Bytes::from("token123"));
//! assert_eq!(cache.get(b"session"), Some(Bytes::from("token123")));
//! ```

pub mod cache;
pub mod shard;

// Re-export commonly used types
pub use cache::{Cache, CacheConfig, DEFAULT_MAX_ITEMS_PER_SHARD, DEFAULT_SHARD_COUNT};
pub use shard::Shard;
