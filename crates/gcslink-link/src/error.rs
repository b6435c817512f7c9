/// Errors that can occur in link management.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A connection attempt is already running on this manager.
    #[error("connection already in progress")]
    ConnectionInProgress,

    /// No link is open.
    #[error("not connected")]
    NotConnected,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] gcslink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] gcslink_frame::FrameError),

    /// The worker thread could not be started.
    #[error("failed to spawn link worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
