use std::time::Duration;

use gcslink_frame::FrameConfig;
use gcslink_transport::TransportConfig;

/// Timing and addressing for a link worker and its manager.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// How long one receive call may block before the stop flag is checked.
    pub poll_interval: Duration,
    /// Silence after the last heartbeat before the link is considered lost.
    pub heartbeat_timeout: Duration,
    /// Pause after a failed read before trying again.
    pub read_error_backoff: Duration,
    /// Delay between a successful open and the initial stream request.
    pub settle_delay: Duration,
    /// Rate requested for all data streams after connecting.
    pub default_stream_rate_hz: u16,
    /// Upper bound on waiting for a stopped worker thread to exit.
    pub teardown_timeout: Duration,
    /// System id commands and stream requests are addressed to.
    pub target_system: u8,
    /// Component id commands and stream requests are addressed to.
    pub target_component: u8,
    pub transport: TransportConfig,
    pub frame: FrameConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            heartbeat_timeout: Duration::from_secs(3),
            read_error_backoff: Duration::from_millis(10),
            settle_delay: Duration::from_millis(500),
            default_stream_rate_hz: 50,
            teardown_timeout: Duration::from_secs(2),
            target_system: 1,
            target_component: 1,
            transport: TransportConfig::default(),
            frame: FrameConfig::default(),
        }
    }
}

impl LinkConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_stream_rate(mut self, rate_hz: u16) -> Self {
        self.default_stream_rate_hz = rate_hz;
        self
    }

    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    pub fn with_target(mut self, system: u8, component: u8) -> Self {
        self.target_system = system;
        self.target_component = component;
        self
    }

    /// Transport settings with the read timeout pinned to the poll interval.
    pub fn effective_transport(&self) -> TransportConfig {
        self.transport.clone().with_read_timeout(self.poll_interval)
    }
}
