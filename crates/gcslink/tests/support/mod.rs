#![allow(dead_code)]

use std::io::Cursor;
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use gcslink::frame::dialect::{
    MavAutopilot, MavMessage, MavModeFlag, MavState, MavType, HEARTBEAT_DATA,
};
use gcslink::frame::{encode_message, FrameReader, FrameVersion, MavHeader, TelemetryMessage};

/// A UDP port that was free a moment ago.
pub fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|s| s.local_addr())
        .expect("probe socket should bind")
        .port()
}

/// A TCP port with nothing listening on it.
pub fn closed_tcp_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("probe listener should bind")
        .port()
}

pub fn heartbeat() -> MavMessage {
    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_QUADROTOR,
        autopilot: MavAutopilot::MAV_AUTOPILOT_PX4,
        base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
        system_status: MavState::MAV_STATE_ACTIVE,
        mavlink_version: 3,
    })
}

/// Simulated vehicle speaking MAVLink 2 over UDP as system 1, component 1.
pub struct Vehicle {
    socket: UdpSocket,
    gcs: SocketAddr,
    sequence: u8,
}

impl Vehicle {
    pub fn new(gcs_port: u16) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("vehicle socket should bind");
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .expect("read timeout");
        Self {
            socket,
            gcs: SocketAddr::from(([127, 0, 0, 1], gcs_port)),
            sequence: 0,
        }
    }

    pub fn send(&mut self, message: &MavMessage) {
        let header = MavHeader {
            system_id: 1,
            component_id: 1,
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);
        let wire = encode_message(FrameVersion::V2, header, message).expect("encode");
        // The ground side may not be bound yet.
        let _ = self.socket.send_to(&wire, self.gcs);
    }

    /// Next decodable message within `timeout`, if any.
    pub fn recv(&self, timeout: Duration) -> Option<TelemetryMessage> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 512];
        while Instant::now() < deadline {
            let Ok((n, _)) = self.socket.recv_from(&mut buf) else {
                continue;
            };
            let mut reader = FrameReader::new(Cursor::new(buf[..n].to_vec()));
            if let Ok(Some(frame)) = reader.read_frame() {
                if let Ok(message) = TelemetryMessage::decode(&frame) {
                    return Some(message);
                }
            }
        }
        None
    }

    /// Send heartbeats every `period` from a background thread.
    pub fn start_heartbeats(&self, period: Duration) -> Beacon {
        let mut vehicle = Vehicle {
            socket: self.socket.try_clone().expect("clone vehicle socket"),
            gcs: self.gcs,
            sequence: 100,
        };
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            while flag.load(Ordering::SeqCst) {
                vehicle.send(&heartbeat());
                thread::sleep(period);
            }
        });
        Beacon {
            running,
            handle: Some(handle),
        }
    }
}

pub struct Beacon {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Beacon {
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("beacon thread");
        }
    }
}

impl Drop for Beacon {
    fn drop(&mut self) {
        self.stop();
    }
}
