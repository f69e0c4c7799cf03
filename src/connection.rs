//! Framed I/O over a TCP socket, split into independent read and write
//! halves.
//!
//! The session's Listen loop owns the [`FrameReader`]; the [`FrameWriter`]
//! is shared behind a mutex because both the Listen loop (responses, DLRs)
//! and HTTP tasks (MT deliveries) write to the same socket, and two writers
//! must never interleave octets within one PDU.

use bytes::{Buf, BytesMut};
use std::io::Cursor;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::dumper;
use crate::frame::{self, Frame};

/// Splits a freshly accepted socket into its two framed halves.
pub fn split(socket: TcpStream) -> (FrameReader, FrameWriter) {
    let (read, write) = socket.into_split();
    (
        FrameReader {
            stream: read,
            buffer: BytesMut::with_capacity(4 * 1024),
        },
        FrameWriter {
            stream: BufWriter::new(write),
        },
    )
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    /// One PDU was malformed but the stream is still aligned on frame
    /// boundaries; the caller may keep reading.
    #[error("pdu decode: {0}")]
    Framing(crate::codec::CodecError),

    /// The length prefix itself is unusable, so the octet stream cannot be
    /// re-synchronized.
    #[error("unrecoverable framing error: {0}")]
    Desync(crate::codec::CodecError),

    /// Peer closed the socket in the middle of a frame.
    #[error("connection reset by peer")]
    Reset,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConnectionError {
    /// Whether the Listen loop may continue after this error (§ error
    /// policy: transient decode errors never kill the session).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConnectionError::Framing(_))
    }
}

/// Buffered, frame-oriented read half.
pub struct FrameReader {
    stream: OwnedReadHalf,
    buffer: BytesMut,
}

impl FrameReader {
    /// Reads one frame, waiting for more data as needed.
    ///
    /// Returns `Ok(None)` on a clean end of stream (the peer closed between
    /// frames). A [`ConnectionError::Framing`] error skips the offending
    /// PDU, so the caller can log it and keep listening.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                dumper::dump_inbound(&frame);
                return Ok(Some(frame));
            }

            // 0 bytes read means the peer closed the connection; that is
            // clean only if no partial frame is left behind.
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ConnectionError::Reset)
                };
            }
        }
    }

    /// Attempts to parse one frame out of the buffer. `Ok(None)` means more
    /// data is needed.
    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        let len = match Frame::check(&mut cursor) {
            Ok(len) => len,
            Err(frame::Error::Incomplete) => return Ok(None),
            Err(frame::Error::Other(e)) => return Err(ConnectionError::Desync(e)),
        };

        // Hand the parser exactly one PDU so trailing TLV parsing cannot
        // run into the next frame.
        let mut pdu = Cursor::new(&self.buffer[..len]);
        let parsed = Frame::parse(&mut pdu);
        self.buffer.advance(len);

        match parsed {
            Ok(frame) => Ok(Some(frame)),
            Err(frame::Error::Incomplete) => {
                // The body was shorter than its header promised; the bad
                // frame has already been discarded.
                Err(ConnectionError::Framing(crate::codec::CodecError::Incomplete))
            }
            Err(frame::Error::Other(e)) => Err(ConnectionError::Framing(e)),
        }
    }
}

/// Buffered write half; flushed after every PDU.
pub struct FrameWriter {
    stream: BufWriter<OwnedWriteHalf>,
}

impl FrameWriter {
    pub async fn write_frame(&mut self, frame: &Frame) -> std::io::Result<()> {
        dumper::dump_outbound(frame);
        self.stream.write_all(&frame.to_bytes()).await?;
        self.stream.flush().await
    }

    /// Flushes and shuts the write direction down, signalling EOF to the
    /// peer's reader.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}
