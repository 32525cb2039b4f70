//! TCP Listener and Accept Loop
//!
//! The server binds one TCP socket, accepts in a loop, and spawns one
//! handler task per connection. Accepted sockets get `TCP_NODELAY` before
//! the handler sees them; small request/response frames must not sit in
//! Nagle's buffer.
//!
//! ## Graceful Shutdown
//!
//! `run` races the accept loop against a caller-supplied shutdown future.
//! When that future completes the listener socket is dropped (no new
//! connections) and the server waits for every in-flight handler to exit
//! before returning, so no request that was mid-flight is dropped.
//!
//! Handler tracking uses the channel-drain idiom: every spawned handler
//! holds a clone of an `mpsc::Sender` it never sends on. Once the server
//! drops its own clone, `recv()` returning `None` proves all handlers are
//! gone.

use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::Cache;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{error, info, warn};

/// Accept retry backoff cap in seconds; an error that survives backoff this
/// long is treated as permanent.
const MAX_ACCEPT_BACKOFF_SECS: u64 = 64;

/// A bound cache server, ready to run.
pub struct Server {
    listener: TcpListener,
    cache: Arc<Cache>,
    stats: Arc<ConnectionStats>,
    shutdown_complete_tx: mpsc::Sender<()>,
    shutdown_complete_rx: mpsc::Receiver<()>,
}

impl Server {
    /// Binds the listening socket.
    pub async fn bind(addr: &str, cache: Arc<Cache>) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);
        Ok(Server {
            listener,
            cache,
            stats: Arc::new(ConnectionStats::new()),
            shutdown_complete_tx,
            shutdown_complete_rx,
        })
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared connection counters.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Serves until `shutdown` completes or accepting fails permanently,
    /// then drains in-flight connections before returning.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        tokio::select! {
            result = self.accept_loop() => {
                if let Err(err) = result {
                    error!(error = %err, "permanent accept failure, stopping listener");
                    return Err(err);
                }
            }
            _ = shutdown => {
                info!("shutdown signal received, draining connections");
            }
        }

        let Server {
            listener,
            stats,
            shutdown_complete_tx,
            mut shutdown_complete_rx,
            ..
        } = self;

        // Close the listening socket first so no new handlers appear, then
        // wait for the last handler to drop its sender clone.
        drop(listener);
        drop(shutdown_complete_tx);
        let _ = shutdown_complete_rx.recv().await;

        info!(
            served = stats.connections_accepted.load(std::sync::atomic::Ordering::Relaxed),
            "all connections drained"
        );
        Ok(())
    }

    async fn accept_loop(&mut self) -> io::Result<()> {
        loop {
            let (stream, addr) = self.accept().await?;

            // Latency contract: never let small frames sit in Nagle's buffer.
            if let Err(err) = stream.set_nodelay(true) {
                warn!(client = %addr, error = %err, "failed to set TCP_NODELAY");
            }

            let cache = Arc::clone(&self.cache);
            let stats = Arc::clone(&self.stats);
            let shutdown_complete = self.shutdown_complete_tx.clone();
            tokio::spawn(async move {
                handle_connection(stream, addr, cache, stats).await;
                // Dropping the sender reports this handler as drained.
                drop(shutdown_complete);
            });
        }
    }

    /// Accepts one connection, retrying transient failures with exponential
    /// backoff. An error that outlives the backoff cap is permanent.
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        let mut backoff = 1;
        loop {
            match self.listener.accept().await {
                Ok(pair) => return Ok(pair),
                Err(err) => {
                    if backoff > MAX_ACCEPT_BACKOFF_SECS {
                        error!(error = %err, "accept failing persistently, giving up");
                        return Err(err);
                    }
                    warn!(error = %err, backoff_secs = backoff, "accept failed, retrying");
                    time::sleep(Duration::from_secs(backoff)).await;
                    backoff *= 2;
                }
            }
        }
    }
}
