use std::time::{Duration, Instant, SystemTime};

use gcslink_frame::dialect::{MavAutopilot, MavModeFlag, MavState, MavType};
use gcslink_frame::TelemetryMessage;

/// Snapshot of the latest heartbeat from the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatInfo {
    pub last_seen: SystemTime,
    pub system_id: u8,
    pub component_id: u8,
    pub vehicle_type: MavType,
    pub autopilot: MavAutopilot,
    pub base_mode: MavModeFlag,
    pub custom_mode: u32,
    pub system_status: MavState,
    pub mavlink_version: u8,
}

impl HeartbeatInfo {
    /// Extract heartbeat fields, or `None` if `message` is not a heartbeat.
    pub fn from_message(message: &TelemetryMessage) -> Option<Self> {
        let hb = message.as_heartbeat()?;
        Some(Self {
            last_seen: message.received_at(),
            system_id: message.system_id(),
            component_id: message.component_id(),
            vehicle_type: hb.mavtype,
            autopilot: hb.autopilot,
            base_mode: hb.base_mode,
            custom_mode: hb.custom_mode,
            system_status: hb.system_status,
            mavlink_version: hb.mavlink_version,
        })
    }

    pub fn is_armed(&self) -> bool {
        self.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED)
    }
}

/// Heartbeat dead-man's switch.
///
/// The link counts as up from the first heartbeat until more than
/// `timeout` passes without another one. Instants are passed in so the
/// state machine can be driven without sleeping.
#[derive(Debug, Clone)]
pub struct Liveness {
    timeout: Duration,
    last_heartbeat: Option<Instant>,
    connected: bool,
}

impl Liveness {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_heartbeat: None,
            connected: false,
        }
    }

    /// Record a heartbeat. Returns `true` if the link just came up.
    pub fn heartbeat(&mut self, now: Instant) -> bool {
        self.last_heartbeat = Some(now);
        !std::mem::replace(&mut self.connected, true)
    }

    /// Returns `true` if the link just went stale.
    pub fn check(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_heartbeat else {
            return false;
        };
        if self.connected && now.saturating_duration_since(last) > self.timeout {
            self.connected = false;
            return true;
        }
        false
    }

    /// Force the link down. Returns `true` if it was up.
    pub fn mark_lost(&mut self) -> bool {
        std::mem::replace(&mut self.connected, false)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
