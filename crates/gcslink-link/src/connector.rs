//! Seam between the link worker and the byte transport.
//!
//! The worker only sees a [`FrameSource`] and a [`FrameSink`]. The default
//! [`SystemConnector`] builds both halves from a [`LinkStream`]; tests plug
//! in scripted implementations.

use gcslink_frame::dialect::MavMessage;
use gcslink_frame::{FrameReader, FrameWriter, RawFrame};
use gcslink_transport::{ConnectionDescriptor, LinkStream, TransportError};

use crate::config::LinkConfig;
use crate::error::Result;

/// Inbound half of an open link.
pub trait FrameSource: Send {
    /// Next complete frame, or `Ok(None)` if none arrived within the poll
    /// interval. End of stream is `Err(FrameError::ConnectionClosed)`.
    fn receive(&mut self) -> gcslink_frame::Result<Option<RawFrame>>;

    /// Release the underlying device or socket.
    fn close(&mut self);
}

/// Outbound half of an open link.
pub trait FrameSink: Send {
    fn send(&mut self, message: &MavMessage) -> Result<()>;

    fn close(&mut self) {}
}

/// Both halves of a freshly opened link.
pub struct Transport {
    pub source: Box<dyn FrameSource>,
    pub sink: Box<dyn FrameSink>,
}

/// Opens transports for a worker.
pub trait Connector: Send + Sync {
    fn open(&self, descriptor: &ConnectionDescriptor, config: &LinkConfig) -> Result<Transport>;
}

/// Opens real serial ports and sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConnector;

impl Connector for SystemConnector {
    fn open(&self, descriptor: &ConnectionDescriptor, config: &LinkConfig) -> Result<Transport> {
        let stream = gcslink_transport::open(descriptor, &config.effective_transport())?;
        let writer_stream = stream.try_clone()?;

        let reader =
            FrameReader::with_config_link(stream, config.frame.clone(), config.poll_interval)?;
        let writer = FrameWriter::with_config_link(
            writer_stream,
            config.frame.clone(),
            config.transport.write_timeout,
        )?;

        Ok(Transport {
            source: Box::new(StreamSource { reader }),
            sink: Box::new(StreamSink { writer }),
        })
    }
}

struct StreamSource {
    reader: FrameReader<LinkStream>,
}

impl FrameSource for StreamSource {
    fn receive(&mut self) -> gcslink_frame::Result<Option<RawFrame>> {
        self.reader.read_frame()
    }

    fn close(&mut self) {
        self.reader.get_ref().shutdown();
    }
}

struct StreamSink {
    writer: FrameWriter<LinkStream>,
}

impl FrameSink for StreamSink {
    fn send(&mut self, message: &MavMessage) -> Result<()> {
        if self.writer.get_ref().awaiting_peer() {
            return Err(TransportError::NoPeer.into());
        }
        self.writer.write_message(message)?;
        Ok(())
    }

    fn close(&mut self) {
        self.writer.get_ref().shutdown();
    }
}
