//! Wire Types and Protocol Limits
//!
//! This module defines the command and response types exchanged between
//! client and server, together with the tag bytes and size limits that make
//! up the wire contract.
//!
//! ## Frame Layout
//!
//! Every frame is a fixed header followed by a length-delimited payload.
//! All multi-byte integers are big-endian.
//!
//! Command frame (client → server), 9-byte header:
//!
//! ```text
//! offset 0        : 1 byte   command tag (1=SET, 2=GET, 3=DEL)
//! offset 1        : 4 bytes  key length
//! offset 5        : 4 bytes  value length
//! offset 9        : key bytes
//! offset 9+keyLen : value bytes (SET only)
//! ```
//!
//! Response frame (server → client), 5-byte header:
//!
//! ```text
//! offset 0 : 1 byte   response tag (1=OK, 2=ERROR, 3=VALUE, 4=NOT_FOUND)
//! offset 1 : 4 bytes  payload length
//! offset 5 : payload bytes
//! ```
//!
//! Keys and values are opaque octet strings; no encoding is imposed. The
//! ERROR payload is a UTF-8 diagnostic meant for humans, not for matching.

use bytes::Bytes;

/// Maximum key length in bytes. Zero-length keys are invalid.
pub const MAX_KEY_SIZE: usize = 1028;

/// Maximum value length in bytes. Zero-length values are legal.
pub const MAX_VALUE_SIZE: usize = 64 * 1028;

/// Length of the fixed command header: tag + key length + value length.
pub const COMMAND_HEADER_LEN: usize = 9;

/// Length of the fixed response header: tag + payload length.
pub const RESPONSE_HEADER_LEN: usize = 5;

/// Command tag bytes.
pub mod command_tag {
    pub const SET: u8 = 1;
    pub const GET: u8 = 2;
    pub const DEL: u8 = 3;
}

/// Response tag bytes.
pub mod response_tag {
    pub const OK: u8 = 1;
    pub const ERROR: u8 = 2;
    pub const VALUE: u8 = 3;
    pub const NOT_FOUND: u8 = 4;
}

/// A decoded client command.
///
/// Key and value are owned by the command; the decoder copies them out of
/// its scratch buffer so a command stays valid after the next read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value under a key, replacing any previous value.
    Set { key: Bytes, value: Bytes },
    /// Retrieve the value stored under a key.
    Get { key: Bytes },
    /// Remove a key. Removing an absent key is not an error.
    Del { key: Bytes },
}

impl Command {
    /// The tag byte this command carries on the wire.
    pub fn tag(&self) -> u8 {
        match self {
            Command::Set { .. } => command_tag::SET,
            Command::Get { .. } => command_tag::GET,
            Command::Del { .. } => command_tag::DEL,
        }
    }

    /// Human-readable command name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
        }
    }

    /// The key this command operates on.
    pub fn key(&self) -> &Bytes {
        match self {
            Command::Set { key, .. } | Command::Get { key } | Command::Del { key } => key,
        }
    }
}

/// A server response.
///
/// `Ok` and `NotFound` carry no payload by construction, so the encoder
/// only has to police the payload size invariant at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The operation succeeded (SET, DEL).
    Ok,
    /// A terminal error; the payload is a UTF-8 diagnostic.
    Error(String),
    /// A GET hit; the payload is the stored value.
    Value(Bytes),
    /// A GET miss. Not an error.
    NotFound,
}

impl Response {
    /// The tag byte this response carries on the wire.
    pub fn tag(&self) -> u8 {
        match self {
            Response::Ok => response_tag::OK,
            Response::Error(_) => response_tag::ERROR,
            Response::Value(_) => response_tag::VALUE,
            Response::NotFound => response_tag::NOT_FOUND,
        }
    }

    /// The payload bytes, empty for `Ok` and `NotFound`.
    pub fn payload(&self) -> &[u8] {
        match self {
            Response::Ok | Response::NotFound => &[],
            Response::Error(msg) => msg.as_bytes(),
            Response::Value(value) => value,
        }
    }
}
