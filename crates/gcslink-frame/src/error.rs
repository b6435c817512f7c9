/// Errors that can occur while reading, decoding or encoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The transport failed to open or configure the stream.
    #[error("transport error: {0}")]
    Transport(#[from] gcslink_transport::TransportError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached end of file.
    #[error("connection closed")]
    ConnectionClosed,

    /// A complete frame failed CRC or message-id validation.
    #[error("failed to decode frame: {0}")]
    Decode(String),

    /// A message could not be serialised.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
