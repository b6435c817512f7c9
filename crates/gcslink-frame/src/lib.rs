//! MAVLink framing and typed telemetry messages.
//!
//! Byte streams from `gcslink-transport` are cut into whole MAVLink v1/v2
//! frames here, independent of how the bytes arrived (serial chunks, UDP
//! datagrams, TCP segments). Frames decode into [`TelemetryMessage`], an
//! immutable, cheaply cloned wrapper around `mavlink::common::MavMessage`.
//!
//! Decoding itself is delegated to the `mavlink` crate.

pub mod attitude;
pub mod codec;
pub mod error;
pub mod fields;
pub mod message;
pub mod reader;
pub mod writer;

pub use attitude::{quaternion_to_euler, EulerAngles};
pub use codec::{decode_frame, encode_message, FrameConfig, FrameVersion, RawFrame, MAX_FRAME_SIZE};
pub use error::{FrameError, Result};
pub use fields::{plot_fields, plottable_types, EULER_ANGLES};
pub use message::TelemetryMessage;
pub use reader::FrameReader;
pub use writer::FrameWriter;

/// Re-export of the MAVLink dialect used on the wire.
pub use mavlink::common as dialect;
pub use mavlink::{MavHeader, MavlinkVersion};
