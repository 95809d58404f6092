use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::codec::{FrameConfig, Message};
use crate::decoder::FrameDecoder;
use crate::error::{FrameError, Result};

/// Reads decoded messages from any `Read` stream.
///
/// Handles partial and frame-unaligned reads internally; callers always get
/// whole messages. Read timeouts (`TimedOut`/`WouldBlock`) are treated as
/// "no data yet" so a serial port with a short poll timeout can be read in a
/// loop. End-of-stream and every other error abandon any partial frame.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    chunk: Vec<u8>,
    decoder: FrameDecoder,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            decoder: FrameDecoder::new(),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            while self.buf.has_remaining() {
                let byte = self.buf.get_u8();
                if let Some(message) = self.decoder.feed(byte) {
                    return Ok(message);
                }
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
                    ) =>
                {
                    continue
                }
                Err(err) => {
                    self.abandon();
                    return Err(FrameError::Io(err));
                }
            };

            if read == 0 {
                self.abandon();
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&self.chunk[..read]);
        }
    }

    fn abandon(&mut self) {
        if self.decoder.abandon() || !self.buf.is_empty() {
            debug!(buffered = self.buf.len(), "discarding undecoded input");
        }
        self.buf.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
