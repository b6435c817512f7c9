use std::path::PathBuf;

/// Errors that can occur while managing a session log.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The log directory could not be created.
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No new log file could be created.
    #[error("failed to create log file {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing or flushing the log failed.
    #[error("log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message fields could not be serialised.
    #[error("failed to serialise message fields: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BrokerError>;

/// Failure reported by a subscriber callback.
///
/// The broker logs it and carries on; it never reaches the publisher.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SubscriberError(String);

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<BrokerError> for SubscriberError {
    fn from(err: BrokerError) -> Self {
        Self(err.to_string())
    }
}

impl From<std::io::Error> for SubscriberError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}
