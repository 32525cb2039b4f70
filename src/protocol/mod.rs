//! Wire Protocol
//!
//! This module implements the length-prefixed binary protocol the server
//! speaks over TCP: three commands (SET, GET, DEL) and four response tags
//! (OK, ERROR, VALUE, NOT_FOUND), all framed by a fixed header carrying
//! big-endian payload lengths.
//!
//! ## Modules
//!
//! - `types`: frame constants, `Command` and `Response`
//! - `codec`: `CommandDecoder` and `ResponseEncoder` over async I/O
//!
//! ## Example
//!
//! ```ignore
//! use voltkv::protocol::{CommandDecoder, ResponseEncoder, Command, Response};
//!
//! let mut decoder = CommandDecoder::new();
//! let mut encoder = ResponseEncoder::new();
//!
//! while let Some(command) = decoder.read_command(&mut reader).await? {
//!     let response = execute(command);
//!     encoder.write_response(&mut writer, &response).await?;
//! }
//! ```

pub mod codec;
pub mod types;

// Re-export commonly used types for convenience
pub use codec::{CommandDecoder, ProtocolError, ResponseEncoder};
pub use types::{
    command_tag, response_tag, Command, Response, COMMAND_HEADER_LEN, MAX_KEY_SIZE,
    MAX_VALUE_SIZE, RESPONSE_HEADER_LEN,
};
