use bytes::{Buf, Bytes, BytesMut};
use mavlink::common::MavMessage;
use mavlink::{MavHeader, MavlinkVersion, Message};
use tracing::trace;

use crate::error::{FrameError, Result};

/// Start-of-frame marker for MAVLink 1.
pub const MAGIC_V1: u8 = 0xFE;

/// Start-of-frame marker for MAVLink 2.
pub const MAGIC_V2: u8 = 0xFD;

/// Header bytes before the payload: magic, len, seq, sys, comp, msgid.
const V1_HEADER_SIZE: usize = 6;

/// Header bytes before the payload: magic, len, incompat, compat, seq,
/// sys, comp, msgid (3 bytes).
const V2_HEADER_SIZE: usize = 10;

const CHECKSUM_SIZE: usize = 2;
const SIGNATURE_SIZE: usize = 13;
const INCOMPAT_FLAG_SIGNED: u8 = 0x01;

/// Largest possible frame: signed MAVLink 2 with a 255-byte payload.
pub const MAX_FRAME_SIZE: usize = V2_HEADER_SIZE + 255 + CHECKSUM_SIZE + SIGNATURE_SIZE;

/// MAVLink wire version of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameVersion {
    V1,
    V2,
}

impl FrameVersion {
    pub fn to_mavlink(self) -> MavlinkVersion {
        match self {
            FrameVersion::V1 => MavlinkVersion::V1,
            FrameVersion::V2 => MavlinkVersion::V2,
        }
    }
}

/// One complete, undecoded MAVLink frame as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    version: FrameVersion,
    bytes: Bytes,
}

impl RawFrame {
    pub fn new(version: FrameVersion, bytes: impl Into<Bytes>) -> Self {
        Self {
            version,
            bytes: bytes.into(),
        }
    }

    pub fn version(&self) -> FrameVersion {
        self.version
    }

    /// The frame bytes, start marker through checksum (and signature).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Cut the next complete frame out of a receive buffer.
///
/// Bytes preceding a start marker are discarded. A candidate whose checksum
/// does not match is treated as a stray marker byte: the splitter steps one
/// byte past it and rescans, so frames that were swallowed into the bogus
/// candidate are still found. Returns `None` when the buffer does not yet
/// hold a whole frame; the partial frame stays buffered.
///
/// Wire layout:
/// ```text
/// v1: FE len seq sys comp msgid           payload crc(2)
/// v2: FD len inc cmp seq sys comp msgid(3) payload crc(2) [signature(13)]
/// ```
pub fn decode_frame(src: &mut BytesMut) -> Option<RawFrame> {
    loop {
        match src.iter().position(|b| *b == MAGIC_V1 || *b == MAGIC_V2) {
            Some(0) => {}
            Some(skip) => src.advance(skip),
            None => {
                src.clear();
                return None;
            }
        }

        if src.len() < 3 {
            return None; // Need more data
        }

        let payload_len = src[1] as usize;
        let (version, header_len, size) = if src[0] == MAGIC_V1 {
            (
                FrameVersion::V1,
                V1_HEADER_SIZE,
                V1_HEADER_SIZE + payload_len + CHECKSUM_SIZE,
            )
        } else {
            let signed = src[2] & INCOMPAT_FLAG_SIGNED != 0;
            let base = V2_HEADER_SIZE + payload_len + CHECKSUM_SIZE;
            (
                FrameVersion::V2,
                V2_HEADER_SIZE,
                if signed { base + SIGNATURE_SIZE } else { base },
            )
        };

        if src.len() < size {
            return None; // Need more data
        }

        if !checksum_matches(&src[..size], version, header_len + payload_len) {
            trace!(marker = src[0], size, "checksum mismatch, resyncing");
            src.advance(1);
            continue;
        }

        return Some(RawFrame {
            version,
            bytes: src.split_to(size).freeze(),
        });
    }
}

// Ids outside the dialect have no CRC_EXTRA and fail here too; they could
// not be decoded downstream either.
fn checksum_matches(frame: &[u8], version: FrameVersion, crc_offset: usize) -> bool {
    let id = match version {
        FrameVersion::V1 => u32::from(frame[5]),
        FrameVersion::V2 => u32::from_le_bytes([frame[7], frame[8], frame[9], 0]),
    };
    let wire = u16::from_le_bytes([frame[crc_offset], frame[crc_offset + 1]]);
    wire == mavlink::calculate_crc(&frame[1..crc_offset], MavMessage::extra_crc(id))
}

/// Serialise a message into a single wire frame.
pub fn encode_message(
    version: FrameVersion,
    header: MavHeader,
    message: &MavMessage,
) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(MAX_FRAME_SIZE);
    mavlink::write_versioned_msg(&mut buf, version.to_mavlink(), header, message)
        .map_err(|err| FrameError::Encode(format!("{err:?}")))?;
    Ok(Bytes::from(buf))
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Wire version for outbound frames. Default: MAVLink 2.
    pub version: FrameVersion,
    /// System id stamped on outbound frames. Default: 255 (ground station).
    pub source_system: u8,
    /// Component id stamped on outbound frames. Default: 0.
    pub source_component: u8,
    /// Receive buffer bound; a buffer that grows past this without yielding
    /// a frame is discarded. Default: 16 KiB.
    pub max_buffered: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            version: FrameVersion::V2,
            source_system: 255,
            source_component: 0,
            max_buffered: 16 * 1024,
        }
    }
}

impl FrameConfig {
    pub fn with_version(mut self, version: FrameVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_source(mut self, system: u8, component: u8) -> Self {
        self.source_system = system;
        self.source_component = component;
        self
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;
    use mavlink::common::{MavAutopilot, MavModeFlag, MavState, MavType, HEARTBEAT_DATA};

    use super::*;

    fn heartbeat() -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 4,
            mavtype: MavType::MAV_TYPE_QUADROTOR,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        })
    }

    fn header() -> MavHeader {
        MavHeader {
            system_id: 1,
            component_id: 1,
            sequence: 7,
        }
    }

    #[test]
    fn splits_v2_frame() {
        let wire = encode_message(FrameVersion::V2, header(), &heartbeat()).unwrap();
        let mut buf = BytesMut::from(wire.as_ref());

        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame.version(), FrameVersion::V2);
        assert_eq!(frame.as_bytes(), wire.as_ref());
        assert!(buf.is_empty());
    }

    #[test]
    fn splits_v1_frame() {
        let wire = encode_message(FrameVersion::V1, header(), &heartbeat()).unwrap();
        assert_eq!(wire[0], MAGIC_V1);
        let mut buf = BytesMut::from(wire.as_ref());

        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame.version(), FrameVersion::V1);
        assert_eq!(frame.wire_size(), wire.len());
    }

    #[test]
    fn incomplete_frame_stays_buffered() {
        let wire = encode_message(FrameVersion::V2, header(), &heartbeat()).unwrap();
        let mut buf = BytesMut::from(&wire[..wire.len() - 3]);

        assert!(decode_frame(&mut buf).is_none());
        assert_eq!(buf.len(), wire.len() - 3);

        buf.extend_from_slice(&wire[wire.len() - 3..]);
        assert!(decode_frame(&mut buf).is_some());
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let wire = encode_message(FrameVersion::V2, header(), &heartbeat()).unwrap();
        let mut buf = BytesMut::new();
        buf.put_slice(b"\x00\x11boot banner\r\n");
        buf.put_slice(&wire);

        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame.as_bytes(), wire.as_ref());
    }

    #[test]
    fn buffer_without_marker_is_cleared() {
        let mut buf = BytesMut::from(&b"no frames here"[..]);
        assert!(decode_frame(&mut buf).is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn signed_v2_frame_includes_signature() {
        let wire = encode_message(FrameVersion::V2, header(), &heartbeat()).unwrap();
        let mut signed = wire.to_vec();
        signed[2] |= INCOMPAT_FLAG_SIGNED;
        let crc_offset = signed.len() - CHECKSUM_SIZE;
        let crc = mavlink::calculate_crc(
            &signed[1..crc_offset],
            MavMessage::extra_crc(0),
        );
        signed[crc_offset..].copy_from_slice(&crc.to_le_bytes());
        signed.extend_from_slice(&[0xA5; SIGNATURE_SIZE]);

        let mut buf = BytesMut::from(signed.as_slice());
        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame.wire_size(), signed.len());
        assert!(buf.is_empty());
    }

    #[test]
    fn stray_marker_does_not_swallow_following_frames() {
        let first = encode_message(FrameVersion::V2, header(), &heartbeat()).unwrap();
        let second = encode_message(FrameVersion::V1, header(), &heartbeat()).unwrap();
        let mut buf = BytesMut::new();
        // A lone v2 marker claiming a 40-byte payload that covers both frames.
        buf.put_slice(&[MAGIC_V2, 40, 0x00]);
        buf.put_slice(&first);
        buf.put_slice(&second);
        buf.put_slice(&[0u8; 32]);

        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame.as_bytes(), first.as_ref());
        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame.as_bytes(), second.as_ref());
    }

    #[test]
    fn corrupted_frame_is_skipped_for_the_next_one() {
        let mut corrupt = encode_message(FrameVersion::V2, header(), &heartbeat())
            .unwrap()
            .to_vec();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        let good = encode_message(FrameVersion::V2, header(), &heartbeat()).unwrap();
        let mut buf = BytesMut::new();
        buf.put_slice(&corrupt);
        buf.put_slice(&good);
        // Keeps any marker byte inside the corrupt checksum resolvable.
        buf.put_slice(&[0u8; MAX_FRAME_SIZE]);

        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame.as_bytes(), good.as_ref());
        assert!(decode_frame(&mut buf).is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn back_to_back_frames() {
        let mut buf = BytesMut::new();
        buf.put_slice(&encode_message(FrameVersion::V2, header(), &heartbeat()).unwrap());
        buf.put_slice(&encode_message(FrameVersion::V1, header(), &heartbeat()).unwrap());

        assert_eq!(decode_frame(&mut buf).unwrap().version(), FrameVersion::V2);
        assert_eq!(decode_frame(&mut buf).unwrap().version(), FrameVersion::V1);
        assert!(decode_frame(&mut buf).is_none());
    }
}
