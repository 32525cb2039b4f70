//! Connection Module
//!
//! Each accepted connection is served by its own async task running a
//! [`ConnectionHandler`]: a sequential decode → dispatch → respond loop over
//! a buffered reader/writer pair. Responses on one connection always come
//! back in request order; across connections no ordering exists.
//!
//! ## Example
//!
//! ```ignore
//! use voltkv::connection::{handle_connection, ConnectionStats};
//! use voltkv::storage::Cache;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(Cache::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, Arc::clone(&cache), Arc::clone(&stats)));
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
