use gcslink_frame::{EulerAngles, TelemetryMessage};

use crate::heartbeat::HeartbeatInfo;

/// Identifies one worker across its lifetime. Never reused by a manager.
pub type WorkerId = u64;

/// Events sent from a worker thread to its manager, tagged with the
/// worker's id on the channel.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The transport open finished.
    ConnectionReady { success: bool, message: String },
    /// Heartbeat liveness changed.
    LinkStatusChanged(bool),
    Heartbeat(HeartbeatInfo),
    Message(TelemetryMessage),
    Attitude(EulerAngles),
    Error(String),
    /// The worker thread is exiting. Always the last event from a worker.
    Finished,
}

/// Events delivered to the interactive side by
/// [`LinkManager::poll_events`](crate::LinkManager::poll_events).
#[derive(Debug, Clone)]
pub enum LinkEvent {
    ConnectionAttemptStarted,
    ConnectionAttemptFinished { success: bool, message: String },
    LinkStatusChanged(bool),
    HeartbeatReceived(HeartbeatInfo),
    MessageReceived(TelemetryMessage),
    /// Euler angles derived from an `ATTITUDE_QUATERNION` message.
    AttitudeReceived(EulerAngles),
    ErrorOccurred(String),
}

impl LinkEvent {
    /// Short name for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            LinkEvent::ConnectionAttemptStarted => "connection_attempt_started",
            LinkEvent::ConnectionAttemptFinished { .. } => "connection_attempt_finished",
            LinkEvent::LinkStatusChanged(_) => "link_status_changed",
            LinkEvent::HeartbeatReceived(_) => "heartbeat_received",
            LinkEvent::MessageReceived(_) => "message_received",
            LinkEvent::AttitudeReceived(_) => "attitude_received",
            LinkEvent::ErrorOccurred(_) => "error_occurred",
        }
    }
}
