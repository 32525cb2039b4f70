//! Connection Handler
//!
//! One handler drives one accepted connection. The handler owns a buffered
//! reader and a buffered writer over the two halves of the socket and runs
//! a strictly sequential loop:
//!
//! ```text
//! 1. decode one command frame
//!        │
//!        ▼
//! 2. dispatch to the cache (SET / GET / DEL)
//!        │
//!        ▼
//! 3. encode the response, flush
//!        │
//!        ▼
//!    [loop back]
//! ```
//!
//! Pipelining falls out of the framing: clients may send many commands
//! back-to-back and the loop answers them one at a time, in order. There is
//! no concurrency inside a single connection.
//!
//! End-of-stream between frames closes the connection cleanly. Any decode
//! error is terminal: the handler makes one best-effort attempt to send an
//! ERROR frame describing the failure, flushes, and closes, because the
//! stream can no longer be trusted to be frame-aligned.

use crate::protocol::{Command, CommandDecoder, ProtocolError, Response, ResponseEncoder};
use crate::storage::Cache;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Counters shared by every connection, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total connections accepted since start.
    pub connections_accepted: AtomicU64,
    /// Connections currently being served.
    pub active_connections: AtomicU64,
    /// Commands executed across all connections.
    pub commands_processed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Frame-level failure; the stream is assumed desynchronised.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport failure while writing or flushing a response.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Drives a single client connection to completion.
pub struct ConnectionHandler {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    addr: SocketAddr,
    cache: Arc<Cache>,
    decoder: CommandDecoder,
    encoder: ResponseEncoder,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        cache: Arc<Cache>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            addr,
            cache,
            decoder: CommandDecoder::new(),
            encoder: ResponseEncoder::new(),
            stats,
        }
    }

    /// Runs the read-execute-respond loop until the peer disconnects or a
    /// terminal error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");
        let result = self.main_loop().await;
        match &result {
            Ok(()) => debug!(client = %self.addr, "client disconnected"),
            Err(err) => debug!(client = %self.addr, error = %err, "connection closed"),
        }
        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let command = match self.decoder.read_command(&mut self.reader).await {
                Ok(Some(command)) => command,
                // Clean close between frames.
                Ok(None) => return Ok(()),
                Err(err) => {
                    warn!(client = %self.addr, error = %err, "terminal protocol error");
                    self.send_error_best_effort(&err).await;
                    return Err(err.into());
                }
            };

            let response = self.execute(command);
            self.stats.command_processed();

            self.encoder
                .write_response(&mut self.writer, &response)
                .await?;
            self.writer.flush().await?;
        }
    }

    /// Dispatches one command against the cache.
    ///
    /// A GET miss is a NOT_FOUND response, never an error; the cache has no
    /// user-visible failure modes.
    fn execute(&self, command: Command) -> Response {
        match command {
            Command::Set { key, value } => {
                self.cache.set(key, value);
                Response::Ok
            }
            Command::Get { key } => match self.cache.get(&key) {
                Some(value) => Response::Value(value),
                None => Response::NotFound,
            },
            Command::Del { key } => {
                self.cache.delete(&key);
                Response::Ok
            }
        }
    }

    /// One attempt to tell the peer why the connection is about to close.
    /// The stream may already be unusable, so failures are ignored.
    async fn send_error_best_effort(&mut self, err: &ProtocolError) {
        let response = Response::Error(format!("protocol error: {}", err));
        if self
            .encoder
            .write_response(&mut self.writer, &response)
            .await
            .is_ok()
        {
            let _ = self.writer.flush().await;
        }
    }
}

/// Accepts ownership of an accepted socket and serves it to completion.
///
/// This is the task body the listener spawns per connection. It folds
/// expected endings (clean close, peer reset) into debug logging so normal
/// churn does not look like trouble.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    cache: Arc<Cache>,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, cache, stats);
    if let Err(err) = handler.run().await {
        match err {
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => debug!(client = %addr, error = %err, "connection ended with error"),
        }
    }
}
