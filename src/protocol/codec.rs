//! Binary Frame Codec
//!
//! This module reads commands and writes responses in the length-prefixed
//! binary framing described in [`crate::protocol::types`].
//!
//! ## How the Decoder Works
//!
//! `read_command` consumes exactly one frame from the reader and returns:
//!
//! - `Ok(Some(command))` - a complete, validated command
//! - `Ok(None)` - the peer closed the stream between frames (clean close)
//! - `Err(e)` - a terminal error; the stream must be assumed desynchronised
//!   and the connection closed
//!
//! The header is read with a manual fill loop so that end-of-stream at
//! offset zero (a normal disconnect) can be told apart from end-of-stream
//! inside a frame (a truncated frame). All header validation happens before
//! the payload read, so a malformed header never consumes payload bytes.
//!
//! ## Buffer Reuse
//!
//! Both halves of the codec keep a scratch `Vec<u8>` that is reused across
//! calls. Payload bytes that outlive a call - the key and value held by a
//! `Command` - are copied out of scratch into owned `Bytes` before the call
//! returns. One decoder/encoder pair belongs to one connection task, so no
//! locking is involved.

use crate::protocol::types::{
    command_tag, Command, Response, COMMAND_HEADER_LEN, MAX_KEY_SIZE, MAX_VALUE_SIZE,
    RESPONSE_HEADER_LEN,
};
use bytes::Bytes;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors that can occur while decoding commands or encoding responses.
///
/// Every variant is terminal for the connection it occurred on. A clean
/// disconnect is not an error (the decoder returns `Ok(None)`), and a GET
/// miss is a response tag, never an error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream ended after at least one byte of a frame was read.
    #[error("connection closed mid-frame")]
    TruncatedFrame,

    /// Key length outside `1..=MAX_KEY_SIZE`.
    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// Value length above `MAX_VALUE_SIZE`.
    #[error("invalid value length: {0}")]
    InvalidValueLength(usize),

    /// Value bytes announced for a command that takes none.
    #[error("protocol violation: value data sent for non-SET command (tag {tag})")]
    UnexpectedPayload { tag: u8 },

    /// The command tag is not SET, GET or DEL.
    #[error("unknown command tag: {0}")]
    UnknownCommand(u8),

    /// A non-diagnostic response payload exceeded `MAX_VALUE_SIZE`.
    #[error("response payload of {0} bytes exceeds maximum size")]
    OversizedPayload(usize),

    /// Read or write failure on the underlying transport.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Decodes command frames from an async reader.
///
/// The scratch buffer grows to the largest payload seen and is reused for
/// every subsequent read on the same connection.
#[derive(Debug, Default)]
pub struct CommandDecoder {
    scratch: Vec<u8>,
}

impl CommandDecoder {
    pub fn new() -> Self {
        Self {
            scratch: Vec::with_capacity(1024),
        }
    }

    /// Reads exactly one command frame.
    ///
    /// Returns `Ok(None)` when the peer closed the stream before sending any
    /// byte of a new frame; every other early end-of-stream is a
    /// [`ProtocolError::TruncatedFrame`].
    pub async fn read_command<R>(&mut self, reader: &mut R) -> Result<Option<Command>, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; COMMAND_HEADER_LEN];
        let mut filled = 0;
        while filled < COMMAND_HEADER_LEN {
            let n = reader.read(&mut header[filled..]).await?;
            if n == 0 {
                // EOF between frames is a normal disconnect; EOF inside the
                // header means the peer died mid-frame.
                return if filled == 0 {
                    Ok(None)
                } else {
                    Err(ProtocolError::TruncatedFrame)
                };
            }
            filled += n;
        }

        let tag = header[0];
        let key_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let val_len = u32::from_be_bytes([header[5], header[6], header[7], header[8]]) as usize;

        if key_len == 0 || key_len > MAX_KEY_SIZE {
            return Err(ProtocolError::InvalidKeyLength(key_len));
        }
        if val_len > MAX_VALUE_SIZE {
            return Err(ProtocolError::InvalidValueLength(val_len));
        }
        if val_len > 0 && (tag == command_tag::GET || tag == command_tag::DEL) {
            return Err(ProtocolError::UnexpectedPayload { tag });
        }
        if !matches!(tag, command_tag::SET | command_tag::GET | command_tag::DEL) {
            return Err(ProtocolError::UnknownCommand(tag));
        }

        let payload_len = if tag == command_tag::SET {
            key_len + val_len
        } else {
            key_len
        };
        self.scratch.resize(payload_len, 0);
        reader.read_exact(&mut self.scratch).await.map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                ProtocolError::TruncatedFrame
            } else {
                ProtocolError::Io(err)
            }
        })?;

        // The command must own its data; the scratch is reused on the next read.
        let key = Bytes::copy_from_slice(&self.scratch[..key_len]);
        let command = match tag {
            command_tag::SET => Command::Set {
                key,
                value: Bytes::copy_from_slice(&self.scratch[key_len..]),
            },
            command_tag::GET => Command::Get { key },
            _ => Command::Del { key },
        };
        Ok(Some(command))
    }
}

/// Encodes response frames into an async writer.
///
/// Each response is assembled in a reusable buffer and handed to the
/// transport as a single `write_all`; the caller decides when to flush.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    buf: Vec<u8>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(RESPONSE_HEADER_LEN + 1024),
        }
    }

    /// Writes one response frame.
    ///
    /// ERROR diagnostics longer than `MAX_VALUE_SIZE` are truncated. Any
    /// other oversized payload is replaced on the wire by an internal ERROR
    /// frame and reported to the caller as
    /// [`ProtocolError::OversizedPayload`], which is terminal.
    pub async fn write_response<W>(
        &mut self,
        writer: &mut W,
        response: &Response,
    ) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let payload = response.payload();
        if payload.len() > MAX_VALUE_SIZE {
            if matches!(response, Response::Error(_)) {
                self.encode_frame(response.tag(), &payload[..MAX_VALUE_SIZE]);
                writer.write_all(&self.buf).await?;
                return Ok(());
            }
            let substitute = Response::Error(
                "internal: response payload exceeds maximum size".to_string(),
            );
            self.encode_frame(substitute.tag(), substitute.payload());
            writer.write_all(&self.buf).await?;
            return Err(ProtocolError::OversizedPayload(payload.len()));
        }

        self.encode_frame(response.tag(), payload);
        writer.write_all(&self.buf).await?;
        Ok(())
    }

    fn encode_frame(&mut self, tag: u8, payload: &[u8]) {
        self.buf.clear();
        self.buf.push(tag);
        self.buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::response_tag;

    /// Builds a raw command frame from its parts.
    fn frame(tag: u8, key: &[u8], value: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(tag);
        buf.extend_from_slice(&(key.len() as u32).to_be_bytes());
        buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(value);
        buf
    }

    async fn decode(bytes: &[u8]) -> Result<Option<Command>, ProtocolError> {
        let mut reader = bytes;
        CommandDecoder::new().read_command(&mut reader).await
    }

    #[tokio::test]
    async fn decode_set_frame() {
        let cmd = decode(&frame(command_tag::SET, b"foo", b"hello"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: Bytes::from_static(b"foo"),
                value: Bytes::from_static(b"hello"),
            }
        );
    }

    #[tokio::test]
    async fn decode_get_frame() {
        let cmd = decode(&frame(command_tag::GET, b"foo", b""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            Command::Get {
                key: Bytes::from_static(b"foo"),
            }
        );
    }

    #[tokio::test]
    async fn decode_del_frame() {
        let cmd = decode(&frame(command_tag::DEL, b"foo", b""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            Command::Del {
                key: Bytes::from_static(b"foo"),
            }
        );
    }

    #[tokio::test]
    async fn decode_set_with_empty_value() {
        let cmd = decode(&frame(command_tag::SET, b"k", b""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                key: Bytes::from_static(b"k"),
                value: Bytes::new(),
            }
        );
    }

    #[tokio::test]
    async fn clean_eof_returns_none() {
        assert!(decode(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncation_at_every_byte_position() {
        let full = frame(command_tag::SET, b"foo", b"hello");
        for cut in 1..full.len() {
            let result = decode(&full[..cut]).await;
            assert!(
                matches!(result, Err(ProtocolError::TruncatedFrame)),
                "cut at {} should be a truncated frame, got {:?}",
                cut,
                result
            );
        }
    }

    #[tokio::test]
    async fn unknown_tag_rejected() {
        for tag in [0u8, 4, 42, 255] {
            let result = decode(&frame(tag, b"foo", b"")).await;
            assert!(
                matches!(result, Err(ProtocolError::UnknownCommand(t)) if t == tag),
                "tag {} should be rejected, got {:?}",
                tag,
                result
            );
        }
    }

    #[tokio::test]
    async fn zero_key_length_rejected() {
        // SET with keyLen=0, valLen=1: rejected before the payload is read.
        let result = decode(&frame(command_tag::SET, b"", b"x")).await;
        assert!(matches!(result, Err(ProtocolError::InvalidKeyLength(0))));
    }

    #[tokio::test]
    async fn oversized_key_length_rejected() {
        let mut buf = vec![command_tag::GET];
        buf.extend_from_slice(&((MAX_KEY_SIZE as u32 + 1).to_be_bytes()));
        buf.extend_from_slice(&0u32.to_be_bytes());
        let result = decode(&buf).await;
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidKeyLength(n)) if n == MAX_KEY_SIZE + 1
        ));
    }

    #[tokio::test]
    async fn oversized_value_length_rejected() {
        let mut buf = vec![command_tag::SET];
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&((MAX_VALUE_SIZE as u32 + 1).to_be_bytes()));
        buf.push(b'k');
        let result = decode(&buf).await;
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidValueLength(n)) if n == MAX_VALUE_SIZE + 1
        ));
    }

    #[tokio::test]
    async fn get_with_payload_rejected() {
        let result = decode(&frame(command_tag::GET, b"foo", b"x")).await;
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedPayload { tag: command_tag::GET })
        ));
    }

    #[tokio::test]
    async fn del_with_payload_rejected() {
        let result = decode(&frame(command_tag::DEL, b"foo", b"x")).await;
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedPayload { tag: command_tag::DEL })
        ));
    }

    #[tokio::test]
    async fn max_size_key_and_value_accepted() {
        let key = vec![b'k'; MAX_KEY_SIZE];
        let value = vec![b'v'; MAX_VALUE_SIZE];
        let cmd = decode(&frame(command_tag::SET, &key, &value))
            .await
            .unwrap()
            .unwrap();
        match cmd {
            Command::Set { key: k, value: v } => {
                assert_eq!(k.len(), MAX_KEY_SIZE);
                assert_eq!(v.len(), MAX_VALUE_SIZE);
            }
            other => panic!("expected SET, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn decoder_scratch_reuse_keeps_commands_independent() {
        let mut stream = frame(command_tag::SET, b"first", b"11111");
        stream.extend_from_slice(&frame(command_tag::SET, b"second", b"22222"));
        let mut reader = &stream[..];
        let mut decoder = CommandDecoder::new();

        let first = decoder.read_command(&mut reader).await.unwrap().unwrap();
        let second = decoder.read_command(&mut reader).await.unwrap().unwrap();

        // The first command must not be clobbered by the second read.
        assert_eq!(
            first,
            Command::Set {
                key: Bytes::from_static(b"first"),
                value: Bytes::from_static(b"11111"),
            }
        );
        assert_eq!(
            second,
            Command::Set {
                key: Bytes::from_static(b"second"),
                value: Bytes::from_static(b"22222"),
            }
        );
        assert!(decoder.read_command(&mut reader).await.unwrap().is_none());
    }

    async fn encode(response: &Response) -> (Vec<u8>, Result<(), ProtocolError>) {
        let mut out = Vec::new();
        let result = ResponseEncoder::new().write_response(&mut out, response).await;
        (out, result)
    }

    #[tokio::test]
    async fn encode_ok() {
        let (out, result) = encode(&Response::Ok).await;
        result.unwrap();
        assert_eq!(out, vec![response_tag::OK, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn encode_not_found() {
        let (out, result) = encode(&Response::NotFound).await;
        result.unwrap();
        assert_eq!(out, vec![response_tag::NOT_FOUND, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn encode_value() {
        let (out, result) = encode(&Response::Value(Bytes::from_static(b"hello"))).await;
        result.unwrap();
        let mut expected = vec![response_tag::VALUE, 0, 0, 0, 5];
        expected.extend_from_slice(b"hello");
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn encode_error() {
        let (out, result) = encode(&Response::Error("bad frame".to_string())).await;
        result.unwrap();
        let mut expected = vec![response_tag::ERROR, 0, 0, 0, 9];
        expected.extend_from_slice(b"bad frame");
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn oversized_error_diagnostic_is_truncated() {
        let long = "x".repeat(MAX_VALUE_SIZE + 100);
        let (out, result) = encode(&Response::Error(long)).await;
        result.unwrap();
        assert_eq!(out[0], response_tag::ERROR);
        let len = u32::from_be_bytes([out[1], out[2], out[3], out[4]]) as usize;
        assert_eq!(len, MAX_VALUE_SIZE);
        assert_eq!(out.len(), RESPONSE_HEADER_LEN + MAX_VALUE_SIZE);
    }

    #[tokio::test]
    async fn oversized_value_replaced_by_internal_error() {
        let huge = Bytes::from(vec![0u8; MAX_VALUE_SIZE + 1]);
        let (out, result) = encode(&Response::Value(huge)).await;
        assert!(matches!(
            result,
            Err(ProtocolError::OversizedPayload(n)) if n == MAX_VALUE_SIZE + 1
        ));
        // A substitute diagnostic frame went out in its place.
        assert_eq!(out[0], response_tag::ERROR);
        let len = u32::from_be_bytes([out[1], out[2], out[3], out[4]]) as usize;
        assert_eq!(out.len(), RESPONSE_HEADER_LEN + len);
    }

    #[tokio::test]
    async fn encoder_buffer_reuse_across_responses() {
        let mut encoder = ResponseEncoder::new();
        let mut out = Vec::new();
        encoder
            .write_response(&mut out, &Response::Value(Bytes::from_static(b"abc")))
            .await
            .unwrap();
        encoder.write_response(&mut out, &Response::Ok).await.unwrap();

        let mut expected = vec![response_tag::VALUE, 0, 0, 0, 3];
        expected.extend_from_slice(b"abc");
        expected.extend_from_slice(&[response_tag::OK, 0, 0, 0, 0]);
        assert_eq!(out, expected);
    }
}
