/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open a serial device.
    #[error("failed to open serial port {path} at {baud_rate} baud: {source}")]
    Serial {
        path: String,
        baud_rate: u32,
        source: serialport::Error,
    },

    /// Failed to bind a local UDP socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to a remote endpoint.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The connection string could not be parsed.
    #[error("invalid connection descriptor {input:?}: {reason}")]
    InvalidDescriptor { input: String, reason: String },

    /// A UDP send was attempted before any peer has been heard from.
    #[error("no peer address known yet")]
    NoPeer,

    /// An I/O error occurred on an open stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the error happened while establishing the link.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Serial { .. }
                | TransportError::Bind { .. }
                | TransportError::Connect { .. }
                | TransportError::InvalidDescriptor { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
