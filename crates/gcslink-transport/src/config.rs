use std::time::Duration;

/// Timeouts applied when opening and driving a [`crate::LinkStream`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Read timeout; bounds how long a receive call may block.
    pub read_timeout: Duration,
    /// Write timeout for outbound frames.
    pub write_timeout: Duration,
    /// Upper bound for establishing a TCP connection.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(50),
            write_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Override the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Override the TCP connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
