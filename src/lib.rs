//! # VoltKV - A Sharded In-Memory Key-Value Cache Server
//!
//! VoltKV is an in-memory key-value cache written in Rust. Clients store,
//! retrieve and delete opaque byte strings over a compact length-prefixed
//! binary protocol on TCP, and the store spreads keys across independently
//! locked shards with per-shard LRU eviction.
//!
//! ## Features
//!
//! - **Sharded Storage**: keys route to one of N shards by FNV-1a hash, so
//!   connections touching different shards never contend on a lock
//! - **LRU Eviction**: each shard is bounded and evicts its least recently
//!   used entry in O(1)
//! - **Binary Protocol**: fixed 9-byte command and 5-byte response headers,
//!   big-endian lengths, no text parsing on the hot path
//! - **Async I/O**: built on Tokio, one task per connection, buffered reads
//!   and writes with `TCP_NODELAY` end to end
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                              VoltKV                                │
//! │                                                                    │
//! │  ┌─────────────┐    ┌──────────────┐    ┌───────────────────────┐  │
//! │  │ TCP Server  │───>│  Connection  │───>│     Binary Codec      │  │
//! │  │ (Listener)  │    │   Handler    │    │  decode cmd / encode  │  │
//! │  └─────────────┘    └──────┬───────┘    └───────────────────────┘  │
//! │                            │                                       │
//! │                            ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────┐  │
//! │  │                           Cache                              │  │
//! │  │   ┌────────┐  ┌────────┐  ┌────────┐  ┌────────┐             │  │
//! │  │   │Shard 0 │  │Shard 1 │  │Shard 2 │  │ ...N   │             │  │
//! │  │   │Mutex   │  │Mutex   │  │Mutex   │  │ shards │             │  │
//! │  │   │map+LRU │  │map+LRU │  │map+LRU │  │        │             │  │
//! │  │   └────────┘  └────────┘  └────────┘  └────────┘             │  │
//! │  └──────────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use voltkv::server::Server;
//! use voltkv::storage::{Cache, CacheConfig};
//! use std::sync::Arc;
//! use tokio::signal;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(Cache::with_config(CacheConfig::default()));
//!     let server = Server::bind("127.0.0.1:6380", cache).await?;
//!     server.run(async {
//!         let _ = signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```
//!
//! Talking to it from Rust:
//!
//! ```ignore
//! use voltkv::client::Client;
//!
//! let mut client = Client::connect("127.0.0.1:6380").await?;
//! client.set(b"user:42", b"Ada").await?;
//! let value = client.get(b"user:42").await?;
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: wire types and the frame codec
//! - [`storage`]: sharded cache with per-shard LRU eviction
//! - [`connection`]: per-connection handler loop
//! - [`server`]: listener, accept loop, graceful shutdown
//! - [`client`]: async client library
//!
//! ## Design Highlights
//!
//! ### Locking
//!
//! Every shard carries its own mutex and no lock spans shards, so the
//! worst-case contention is connections fighting over one shard, not over
//! the store. The lock is exclusive even for reads: a cache hit promotes
//! the entry in the LRU order, which is a mutation.
//!
//! ### Ownership at the Codec Boundary
//!
//! Codecs read into scratch buffers that are reused across requests, and
//! copy out only what outlives the call: the key and value owned by a
//! command, and the value stored in a shard. Values handed back to callers
//! are independent `Bytes` handles, so callers and the store can never
//! mutate each other's data.

pub mod client;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use client::{Client, ClientError};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, CommandDecoder, ProtocolError, Response, ResponseEncoder};
pub use server::Server;
pub use storage::{Cache, CacheConfig};

/// The default address the server binds to.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:6380";

/// Version of VoltKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
