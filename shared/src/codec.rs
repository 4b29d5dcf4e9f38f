//! Envelope framing over byte streams
//!
//! Each frame is a big-endian `u32` body length followed by that many bytes
//! of protobuf `Envelope`:
//! ```text
//! [ len: u32 BE ][ Envelope ]
//! ```
//!
//! A vehicle channel owns one stream, so frames on it arrive in send order.

use bytes::{Buf, BufMut, BytesMut};
use prost::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::Envelope;

/// Largest body either side will send or accept (10 MB)
pub const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

const PREFIX_LEN: usize = 4;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("Invalid message length prefix: {0}")]
    InvalidLength(u32),

    #[error("Protobuf decode error: {0}")]
    DecodeError(#[from] prost::DecodeError),

    #[error("Protobuf encode error: {0}")]
    EncodeError(#[from] prost::EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads framed envelopes from the read half of a stream
pub struct FrameReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Read the next envelope
    ///
    /// Returns `Ok(None)` once the peer closed the stream. Cancel-safe: bytes
    /// already read stay in the buffer for the next call. A stream that ends
    /// inside a frame is treated as closed.
    pub async fn recv(&mut self) -> Result<Option<Envelope>, CodecError> {
        loop {
            if let Some(envelope) = self.next_buffered()? {
                return Ok(Some(envelope));
            }
            if self.reader.read_buf(&mut self.buffer).await? == 0 {
                return Ok(None);
            }
        }
    }

    /// Split one complete frame off the buffer, if there is one
    fn next_buffered(&mut self) -> Result<Option<Envelope>, CodecError> {
        if self.buffer.len() < PREFIX_LEN {
            return Ok(None);
        }

        let len = u32::from_be_bytes([self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]]);
        if len > MAX_MESSAGE_SIZE {
            return Err(CodecError::InvalidLength(len));
        }
        if self.buffer.len() < PREFIX_LEN + len as usize {
            self.buffer.reserve(PREFIX_LEN + len as usize - self.buffer.len());
            return Ok(None);
        }

        self.buffer.advance(PREFIX_LEN);
        let body = self.buffer.split_to(len as usize);
        Ok(Some(Envelope::decode(body)?))
    }
}

/// Writes framed envelopes to the write half of a stream
pub struct FrameWriter<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Frame `envelope` and flush it; nothing is written if it is oversized
    pub async fn send(&mut self, envelope: &Envelope) -> Result<(), CodecError> {
        let len = envelope.encoded_len();
        if len > MAX_MESSAGE_SIZE as usize {
            return Err(CodecError::MessageTooLarge(len));
        }

        self.buffer.clear();
        self.buffer.reserve(PREFIX_LEN + len);
        self.buffer.put_u32(len as u32);
        envelope.encode(&mut self.buffer)?;

        self.writer.write_all(&self.buffer).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
