//! Scripted connector for exercising workers and managers without I/O.

use std::collections::VecDeque;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use gcslink_frame::dialect::{
    MavAutopilot, MavMessage, MavModeFlag, MavState, MavType, ATTITUDE_QUATERNION_DATA,
    HEARTBEAT_DATA, SYS_STATUS_DATA,
};
use gcslink_frame::{
    decode_frame, encode_message, FrameError, FrameReader, FrameVersion, MavHeader, RawFrame,
};
use gcslink_transport::{ConnectionDescriptor, TransportError};
use parking_lot::Mutex;

use crate::config::LinkConfig;
use crate::connector::{Connector, FrameSink, FrameSource, Transport};
use crate::error::Result;

pub(crate) enum Inbound {
    Frame(RawFrame),
    Eof,
    ReadError,
}

enum Planned {
    Fail(String),
    Link {
        inbound: Receiver<Inbound>,
        peer: MockPeer,
        stall: Option<Duration>,
    },
    Nmea {
        preamble: Vec<u8>,
        peer: MockPeer,
    },
}

/// The far end of one scripted link.
#[derive(Clone)]
pub(crate) struct MockPeer {
    pub tx: Sender<Inbound>,
    pub sent: Arc<Mutex<Vec<MavMessage>>>,
    pub closes: Arc<AtomicUsize>,
}

impl MockPeer {
    pub fn push(&self, message: MavMessage) {
        let _ = self.tx.send(Inbound::Frame(frame(message)));
    }

    pub fn push_raw(&self, frame: RawFrame) {
        let _ = self.tx.send(Inbound::Frame(frame));
    }

    pub fn close(&self) {
        let _ = self.tx.send(Inbound::Eof);
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<MavMessage> {
        self.sent.lock().clone()
    }
}

/// Hands out planned links in order; unplanned opens are refused.
#[derive(Default)]
pub(crate) struct MockConnector {
    plan: Mutex<VecDeque<Planned>>,
    opens: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_link(&self) -> MockPeer {
        self.plan_link(None)
    }

    /// A link whose `receive` ignores stop requests for `stall` per call.
    pub fn add_stalled_link(&self, stall: Duration) -> MockPeer {
        self.plan_link(Some(stall))
    }

    /// A link whose wire carries `preamble` and then NMEA text forever:
    /// bytes arrive on every read but never form a frame or time out.
    pub fn add_nmea_link(&self, preamble: Vec<u8>) -> MockPeer {
        let (tx, _inbound) = mpsc::channel();
        let peer = MockPeer {
            tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
        };
        self.plan.lock().push_back(Planned::Nmea {
            preamble,
            peer: peer.clone(),
        });
        peer
    }

    pub fn add_failure(&self, reason: &str) {
        self.plan.lock().push_back(Planned::Fail(reason.to_string()));
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn plan_link(&self, stall: Option<Duration>) -> MockPeer {
        let (tx, inbound) = mpsc::channel();
        let peer = MockPeer {
            tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
        };
        self.plan.lock().push_back(Planned::Link {
            inbound,
            peer: peer.clone(),
            stall,
        });
        peer
    }
}

impl Connector for MockConnector {
    fn open(&self, descriptor: &ConnectionDescriptor, config: &LinkConfig) -> Result<Transport> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let refused = |reason: String| TransportError::Connect {
            addr: descriptor.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, reason),
        };

        match self.plan.lock().pop_front() {
            None => Err(refused("nothing listening".into()).into()),
            Some(Planned::Fail(reason)) => Err(refused(reason).into()),
            Some(Planned::Link {
                inbound,
                peer,
                stall,
            }) => Ok(Transport {
                source: Box::new(MockSource {
                    inbound,
                    poll: config.poll_interval,
                    stall,
                    closes: Arc::clone(&peer.closes),
                }),
                sink: Box::new(MockSink { sent: peer.sent }),
            }),
            Some(Planned::Nmea { preamble, peer }) => Ok(Transport {
                source: Box::new(NmeaSource {
                    reader: FrameReader::with_config(
                        NmeaWire { preamble },
                        config.frame.clone(),
                    ),
                    closes: Arc::clone(&peer.closes),
                }),
                sink: Box::new(MockSink { sent: peer.sent }),
            }),
        }
    }
}

struct MockSource {
    inbound: Receiver<Inbound>,
    poll: Duration,
    stall: Option<Duration>,
    closes: Arc<AtomicUsize>,
}

impl FrameSource for MockSource {
    fn receive(&mut self) -> gcslink_frame::Result<Option<RawFrame>> {
        if let Some(stall) = self.stall {
            thread::sleep(stall);
            return Ok(None);
        }
        match self.inbound.recv_timeout(self.poll) {
            Ok(Inbound::Frame(frame)) => Ok(Some(frame)),
            Ok(Inbound::Eof) => Err(FrameError::ConnectionClosed),
            Ok(Inbound::ReadError) => Err(FrameError::Io(std::io::Error::other("line noise"))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(self.poll);
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

const NMEA_SENTENCE: &[u8] =
    b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";

struct NmeaWire {
    preamble: Vec<u8>,
}

impl Read for NmeaWire {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.preamble.is_empty() {
            let n = self.preamble.len().min(buf.len());
            buf[..n].copy_from_slice(&self.preamble[..n]);
            self.preamble.drain(..n);
            return Ok(n);
        }
        thread::sleep(Duration::from_millis(1));
        let n = NMEA_SENTENCE.len().min(buf.len());
        buf[..n].copy_from_slice(&NMEA_SENTENCE[..n]);
        Ok(n)
    }
}

struct NmeaSource {
    reader: FrameReader<NmeaWire>,
    closes: Arc<AtomicUsize>,
}

impl FrameSource for NmeaSource {
    fn receive(&mut self) -> gcslink_frame::Result<Option<RawFrame>> {
        self.reader.read_frame()
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockSink {
    sent: Arc<Mutex<Vec<MavMessage>>>,
}

impl FrameSink for MockSink {
    fn send(&mut self, message: &MavMessage) -> Result<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

pub(crate) fn frame(message: MavMessage) -> RawFrame {
    let header = MavHeader {
        system_id: 1,
        component_id: 1,
        sequence: 0,
    };
    let wire = encode_message(FrameVersion::V2, header, &message).expect("message should encode");
    decode_frame(&mut BytesMut::from(wire.as_ref())).expect("encoded frame should split")
}

pub(crate) fn heartbeat() -> MavMessage {
    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_QUADROTOR,
        autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
        base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
        system_status: MavState::MAV_STATE_STANDBY,
        mavlink_version: 3,
    })
}

pub(crate) fn yaw_quaternion() -> MavMessage {
    let s = std::f32::consts::FRAC_1_SQRT_2;
    MavMessage::ATTITUDE_QUATERNION(ATTITUDE_QUATERNION_DATA {
        q1: s,
        q4: s,
        ..Default::default()
    })
}

pub(crate) fn sys_status() -> MavMessage {
    MavMessage::SYS_STATUS(SYS_STATUS_DATA {
        voltage_battery: 12_600,
        ..Default::default()
    })
}

pub(crate) fn descriptor() -> ConnectionDescriptor {
    ConnectionDescriptor::udp("127.0.0.1", 14550)
}

pub(crate) fn fast_config() -> LinkConfig {
    LinkConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_settle_delay(Duration::from_millis(20))
        .with_teardown_timeout(Duration::from_millis(500))
}

/// Collect items from `next` until `done` holds or `timeout` passes.
pub(crate) fn collect_until<T>(
    timeout: Duration,
    mut next: impl FnMut(Duration) -> Vec<T>,
    mut done: impl FnMut(&[T]) -> bool,
) -> Vec<T> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while !done(&seen) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        seen.extend(next((deadline - now).min(Duration::from_millis(50))));
    }
    seen
}
