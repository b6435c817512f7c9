use std::fmt;
use std::io;

use gcslink_broker::BrokerError;
use gcslink_frame::FrameError;
use gcslink_link::LinkError;
use gcslink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse | io::ErrorKind::NotFound => {
            TRANSPORT_ERROR
        }
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidDescriptor { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Io(source) => io_error(context, source),
        FrameError::Decode(_) | FrameError::Encode(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::ConnectionInProgress | LinkError::NotConnected => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn broker_error(context: &str, err: BrokerError) -> CliError {
    match err {
        BrokerError::CreateDir { source, .. }
        | BrokerError::CreateFile { source, .. }
        | BrokerError::Io(source) => io_error(context, source),
        BrokerError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_descriptor_is_a_usage_error() {
        let err = "udp::14550"
            .parse::<gcslink_transport::ConnectionDescriptor>()
            .expect_err("descriptor should be rejected");
        assert_eq!(transport_error("bad link", err).code, USAGE);
    }

    #[test]
    fn io_kinds_map_to_exit_codes() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(io_error("open", denied).code, PERMISSION_DENIED);
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "nope");
        assert_eq!(io_error("open", refused).code, TRANSPORT_ERROR);
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(io_error("open", timed_out).code, TIMEOUT);
    }

    #[test]
    fn message_keeps_context() {
        let err = link_error("connect failed", LinkError::ConnectionInProgress);
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.to_string(), "connect failed: connection already in progress");
    }
}
