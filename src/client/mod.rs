//! Client Library
//!
//! An async client for the cache server's binary protocol. One client owns
//! one TCP connection; taking `&mut self` on every operation guarantees a
//! request and its response never interleave with another call's frames on
//! the same socket.
//!
//! Size limits are enforced before anything touches the wire, so an invalid
//! key or value costs a local error, not a killed connection.
//!
//! ## Fatal Errors
//!
//! A malformed response header, an unexpected response tag, or any read or
//! write failure means the connection can no longer be trusted to be
//! frame-aligned. The client then drops the socket; later calls return
//! [`ClientError::Closed`] and the caller should reconnect. A well-formed
//! ERROR response from the server is not fatal: it surfaces as
//! [`ClientError::Server`] and the connection stays usable.
//!
//! ## Example
//!
//! ```ignore
//! use voltkv::client::Client;
//!
//! let mut client = Client::connect("127.0.0.1:6380").await?;
//! client.set(b"name", b"volt").await?;
//! assert_eq!(client.get(b"name").await?.as_deref(), Some(&b"volt"[..]));
//! client.delete(b"name").await?;
//! assert_eq!(client.get(b"name").await?, None);
//! ```

use crate::protocol::{
    command_tag, response_tag, MAX_KEY_SIZE, MAX_VALUE_SIZE, RESPONSE_HEADER_LEN,
};
use bytes::Bytes;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Errors returned by [`Client`] operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The key is empty or longer than the protocol maximum.
    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// The value is longer than the protocol maximum.
    #[error("invalid value length: {0}")]
    InvalidValueLength(usize),

    /// The server answered with an ERROR frame; the connection stays open.
    #[error("server error: {0}")]
    Server(String),

    /// The server broke the wire contract; the connection was dropped.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection was already torn down by an earlier fatal error.
    #[error("client is closed")]
    Closed,

    /// Transport failure; the connection was dropped.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

struct Conn {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    // Reused for every outgoing frame.
    frame: Vec<u8>,
}

/// An async client bound to a single server connection.
pub struct Client {
    conn: Option<Conn>,
}

impl Client {
    /// Dials the server and prepares a connection with `TCP_NODELAY` set.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Client, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        Ok(Client {
            conn: Some(Conn {
                reader: BufReader::new(read_half),
                writer: BufWriter::new(write_half),
                frame: Vec::with_capacity(1024),
            }),
        })
    }

    /// True once a fatal error has torn the connection down.
    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Stores `value` under `key`.
    pub async fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ClientError> {
        validate_key(key)?;
        if value.len() > MAX_VALUE_SIZE {
            return Err(ClientError::InvalidValueLength(value.len()));
        }

        let (tag, payload) = self.round_trip(command_tag::SET, key, value).await?;
        match tag {
            response_tag::OK => Ok(()),
            response_tag::ERROR => Err(server_error(&payload)),
            other => Err(self.fatal_tag("SET", other)),
        }
    }

    /// Retrieves the value stored under `key`; `None` means not found.
    pub async fn get(&mut self, key: &[u8]) -> Result<Option<Bytes>, ClientError> {
        validate_key(key)?;

        let (tag, payload) = self.round_trip(command_tag::GET, key, &[]).await?;
        match tag {
            response_tag::VALUE => Ok(Some(payload)),
            response_tag::NOT_FOUND => Ok(None),
            response_tag::ERROR => Err(server_error(&payload)),
            other => Err(self.fatal_tag("GET", other)),
        }
    }

    /// Removes `key`. Deleting an absent key succeeds.
    pub async fn delete(&mut self, key: &[u8]) -> Result<(), ClientError> {
        validate_key(key)?;

        let (tag, payload) = self.round_trip(command_tag::DEL, key, &[]).await?;
        match tag {
            response_tag::OK => Ok(()),
            response_tag::ERROR => Err(server_error(&payload)),
            other => Err(self.fatal_tag("DEL", other)),
        }
    }

    /// Sends one command frame and reads the matching response.
    /// Any transport or framing failure poisons the connection.
    async fn round_trip(
        &mut self,
        tag: u8,
        key: &[u8],
        value: &[u8],
    ) -> Result<(u8, Bytes), ClientError> {
        let conn = self.conn.as_mut().ok_or(ClientError::Closed)?;
        match Self::exchange(conn, tag, key, value).await {
            Ok(response) => Ok(response),
            Err(err) => {
                self.conn = None;
                Err(err)
            }
        }
    }

    async fn exchange(
        conn: &mut Conn,
        tag: u8,
        key: &[u8],
        value: &[u8],
    ) -> Result<(u8, Bytes), ClientError> {
        conn.frame.clear();
        conn.frame.push(tag);
        conn.frame.extend_from_slice(&(key.len() as u32).to_be_bytes());
        conn.frame.extend_from_slice(&(value.len() as u32).to_be_bytes());
        conn.frame.extend_from_slice(key);
        conn.frame.extend_from_slice(value);
        conn.writer.write_all(&conn.frame).await?;
        conn.writer.flush().await?;

        let mut header = [0u8; RESPONSE_HEADER_LEN];
        conn.reader.read_exact(&mut header).await?;
        let resp_tag = header[0];
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;

        if (resp_tag == response_tag::OK || resp_tag == response_tag::NOT_FOUND) && len != 0 {
            return Err(ClientError::Protocol(format!(
                "unexpected payload of {} bytes for response tag {}",
                len, resp_tag
            )));
        }
        if len > MAX_VALUE_SIZE {
            return Err(ClientError::Protocol(format!(
                "response payload length {} exceeds maximum",
                len
            )));
        }

        let mut payload = vec![0u8; len];
        if len > 0 {
            conn.reader.read_exact(&mut payload).await?;
        }
        Ok((resp_tag, Bytes::from(payload)))
    }

    /// Tears down the connection after a response tag that makes no sense
    /// for the request that was sent.
    fn fatal_tag(&mut self, op: &str, tag: u8) -> ClientError {
        self.conn = None;
        ClientError::Protocol(format!("unexpected response tag {} for {}", tag, op))
    }
}

fn validate_key(key: &[u8]) -> Result<(), ClientError> {
    if key.is_empty() || key.len() > MAX_KEY_SIZE {
        return Err(ClientError::InvalidKeyLength(key.len()));
    }
    Ok(())
}

fn server_error(payload: &[u8]) -> ClientError {
    ClientError::Server(String::from_utf8_lossy(payload).into_owned())
}
