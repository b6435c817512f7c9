use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::BytesMut;
use gcslink_transport::LinkStream;
use tracing::trace;

use crate::codec::{decode_frame, FrameConfig, RawFrame};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete MAVLink frames from any `Read` stream.
///
/// Partial reads are buffered internally; callers only ever see whole
/// frames. A read timeout on the underlying stream surfaces as `Ok(None)`
/// so the caller can check its own stop condition between polls.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
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
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame.
    ///
    /// Performs at most one successful read on the underlying stream per
    /// call, so a peer streaming bytes that never form a frame cannot hold
    /// the caller here. Returns `Ok(None)` when that read (or a timeout)
    /// left no whole frame buffered and `Err(FrameError::ConnectionClosed)`
    /// at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<RawFrame>> {
        if let Some(frame) = decode_frame(&mut self.buf) {
            return Ok(Some(frame));
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(err.kind()) => return Ok(None),
                Err(err) => return Err(FrameError::Io(err)),
            }
        };

        if read == 0 {
            return Err(FrameError::ConnectionClosed);
        }

        self.buf.extend_from_slice(&chunk[..read]);
        if self.buf.len() > self.config.max_buffered {
            trace!(
                buffered = self.buf.len(),
                "receive buffer overflow, discarding"
            );
            self.buf.clear();
            return Ok(None);
        }

        Ok(decode_frame(&mut self.buf))
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
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

impl FrameReader<LinkStream> {
    /// Create a frame reader for a [`LinkStream`], polling at `poll_interval`.
    pub fn with_config_link(
        mut inner: LinkStream,
        config: FrameConfig,
        poll_interval: Duration,
    ) -> Result<Self> {
        inner.set_read_timeout(poll_interval)?;
        Ok(Self::with_config(inner, config))
    }
}

// Serial ports report TimedOut, sockets WouldBlock (unix) or TimedOut (windows).
fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
