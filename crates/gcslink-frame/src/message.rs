use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use std::time::SystemTime;

use mavlink::common::{
    MavMessage, ATTITUDE_DATA, ATTITUDE_QUATERNION_DATA, GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA,
    LOCAL_POSITION_NED_DATA, RC_CHANNELS_DATA, SYS_STATUS_DATA, VFR_HUD_DATA,
};
use mavlink::peek_reader::PeekReader;
use mavlink::{MavHeader, Message};
use serde_json::Value;

use crate::attitude::EulerAngles;
use crate::codec::RawFrame;
use crate::error::{FrameError, Result};
use crate::fields;

/// A decoded MAVLink message with its header and arrival time.
///
/// Immutable once built. Clones share one allocation, so the same message
/// can be handed to any number of subscribers.
#[derive(Clone)]
pub struct TelemetryMessage {
    inner: Arc<Inner>,
}

struct Inner {
    header: MavHeader,
    message: MavMessage,
    received_at: SystemTime,
}

impl TelemetryMessage {
    /// Wrap a message, stamping it with the current time.
    pub fn new(header: MavHeader, message: MavMessage) -> Self {
        Self::with_timestamp(header, message, SystemTime::now())
    }

    pub fn with_timestamp(header: MavHeader, message: MavMessage, received_at: SystemTime) -> Self {
        Self {
            inner: Arc::new(Inner {
                header,
                message,
                received_at,
            }),
        }
    }

    /// Decode a raw frame. CRC mismatches and unknown message ids are
    /// reported as [`FrameError::Decode`].
    pub fn decode(frame: &RawFrame) -> Result<Self> {
        let mut reader = PeekReader::new(Cursor::new(frame.as_bytes()));
        let (header, message) = mavlink::read_versioned_msg::<MavMessage, _>(
            &mut reader,
            frame.version().to_mavlink(),
        )
        .map_err(|err| FrameError::Decode(format!("{err:?}")))?;
        Ok(Self::new(header, message))
    }

    /// MAVLink message name, e.g. `"HEARTBEAT"`.
    pub fn type_name(&self) -> &'static str {
        self.inner.message.message_name()
    }

    pub fn message_id(&self) -> u32 {
        self.inner.message.message_id()
    }

    pub fn system_id(&self) -> u8 {
        self.inner.header.system_id
    }

    pub fn component_id(&self) -> u8 {
        self.inner.header.component_id
    }

    pub fn sequence(&self) -> u8 {
        self.inner.header.sequence
    }

    pub fn header(&self) -> &MavHeader {
        &self.inner.header
    }

    pub fn message(&self) -> &MavMessage {
        &self.inner.message
    }

    pub fn received_at(&self) -> SystemTime {
        self.inner.received_at
    }

    /// Message fields as a JSON object, without the type tag.
    pub fn fields(&self) -> Value {
        let value = serde_json::to_value(&self.inner.message).unwrap_or(Value::Null);
        let Value::Object(mut map) = value else {
            return Value::Object(Default::default());
        };

        map.remove("type");
        let name = self.type_name();
        if map.len() == 1 && matches!(map.get(name), Some(Value::Object(_))) {
            if let Some(inner) = map.remove(name) {
                return inner;
            }
        }
        Value::Object(map)
    }

    /// Numeric value of a field from the plot catalogue, in display units.
    pub fn plot_value(&self, field: &str) -> Option<f64> {
        fields::extract(&self.inner.message, field)
    }

    /// Euler angles derived from an `ATTITUDE_QUATERNION` message.
    pub fn euler_angles(&self) -> Option<EulerAngles> {
        self.as_attitude_quaternion()
            .map(|q| EulerAngles::from_quaternion([q.q1, q.q2, q.q3, q.q4]))
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self.inner.message, MavMessage::HEARTBEAT(_))
    }

    pub fn as_heartbeat(&self) -> Option<&HEARTBEAT_DATA> {
        match &self.inner.message {
            MavMessage::HEARTBEAT(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_attitude_quaternion(&self) -> Option<&ATTITUDE_QUATERNION_DATA> {
        match &self.inner.message {
            MavMessage::ATTITUDE_QUATERNION(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_attitude(&self) -> Option<&ATTITUDE_DATA> {
        match &self.inner.message {
            MavMessage::ATTITUDE(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_global_position(&self) -> Option<&GLOBAL_POSITION_INT_DATA> {
        match &self.inner.message {
            MavMessage::GLOBAL_POSITION_INT(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_local_position(&self) -> Option<&LOCAL_POSITION_NED_DATA> {
        match &self.inner.message {
            MavMessage::LOCAL_POSITION_NED(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_sys_status(&self) -> Option<&SYS_STATUS_DATA> {
        match &self.inner.message {
            MavMessage::SYS_STATUS(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_vfr_hud(&self) -> Option<&VFR_HUD_DATA> {
        match &self.inner.message {
            MavMessage::VFR_HUD(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_rc_channels(&self) -> Option<&RC_CHANNELS_DATA> {
        match &self.inner.message {
            MavMessage::RC_CHANNELS(data) => Some(data),
            _ => None,
        }
    }

    /// True when both handles share the same underlying message.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TelemetryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryMessage")
            .field("type", &self.type_name())
            .field("system_id", &self.system_id())
            .field("component_id", &self.component_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
