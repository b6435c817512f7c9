use std::io::{ErrorKind, Write};
use std::time::Duration;

use gcslink_transport::LinkStream;
use mavlink::common::MavMessage;
use mavlink::MavHeader;

use crate::codec::{encode_message, FrameConfig};
use crate::error::{FrameError, Result};

/// Writes MAVLink frames to any `Write` stream.
///
/// Each message is stamped with the configured source system/component
/// and a sequence number that rolls over after 255.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
    sequence: u8,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            sequence: 0,
        }
    }

    /// Encode and send one message (blocking).
    pub fn write_message(&mut self, message: &MavMessage) -> Result<()> {
        let header = MavHeader {
            system_id: self.config.source_system,
            component_id: self.config.source_component,
            sequence: self.sequence,
        };
        let wire = encode_message(self.config.version, header, message)?;
        self.sequence = self.sequence.wrapping_add(1);

        let mut offset = 0usize;
        while offset < wire.len() {
            match self.inner.write(&wire[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Sequence number the next message will carry.
    pub fn next_sequence(&self) -> u8 {
        self.sequence
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<LinkStream> {
    /// Create a frame writer for a [`LinkStream`] and apply a write timeout.
    pub fn with_config_link(
        mut inner: LinkStream,
        config: FrameConfig,
        write_timeout: Duration,
    ) -> Result<Self> {
        inner.set_write_timeout(write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
