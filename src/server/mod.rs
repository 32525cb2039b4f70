//! Server Module
//!
//! Wires the pieces together: a bound TCP listener, an accept loop that
//! spawns one [`crate::connection::ConnectionHandler`] task per peer, and a
//! graceful shutdown path that stops accepting and drains in-flight
//! handlers.
//!
//! ## Example
//!
//! ```ignore
//! use voltkv::server::Server;
//! use voltkv::storage::Cache;
//! use std::sync::Arc;
//! use tokio::signal;
//!
//! let cache = Arc::new(Cache::new());
//! let server = Server::bind("127.0.0.1:6380", cache).await?;
//! server.run(async {
//!     let _ = signal::ctrl_c().await;
//! }).await?;
//! ```

pub mod listener;

// Re-export commonly used types
pub use listener::Server;
