//! The link worker: one background thread per open link.
//!
//! The thread opens the transport, then loops over
//! receive → decode → heartbeat bookkeeping → event emission until asked
//! to stop or the stream ends. All blocking happens here, bounded by the
//! poll interval, so the owning manager never blocks on I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use gcslink_frame::dialect::{MavCmd, MavMessage, COMMAND_LONG_DATA, REQUEST_DATA_STREAM_DATA};
use gcslink_frame::{FrameError, RawFrame, TelemetryMessage};
use gcslink_transport::ConnectionDescriptor;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::connector::{Connector, FrameSink, FrameSource, Transport};
use crate::error::{LinkError, Result};
use crate::event::{WorkerEvent, WorkerId};
use crate::heartbeat::{HeartbeatInfo, Liveness};

type SharedSink = Arc<Mutex<Option<Box<dyn FrameSink>>>>;
type EventSender = Sender<(WorkerId, WorkerEvent)>;

/// Handle to a running link worker thread.
///
/// Dropping the handle requests a stop but does not wait for the thread.
pub struct LinkWorker {
    id: WorkerId,
    descriptor: ConnectionDescriptor,
    stop: Arc<AtomicBool>,
    sink: SharedSink,
    target_system: u8,
    target_component: u8,
    thread: Option<JoinHandle<()>>,
}

impl LinkWorker {
    /// Start a worker thread for `descriptor`.
    ///
    /// Every event the worker produces is sent on `events` tagged with `id`.
    /// The first event is always `ConnectionReady`, the last `Finished`.
    pub fn spawn(
        id: WorkerId,
        descriptor: ConnectionDescriptor,
        connector: Arc<dyn Connector>,
        config: LinkConfig,
        events: EventSender,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let sink: SharedSink = Arc::new(Mutex::new(None));
        let (target_system, target_component) = (config.target_system, config.target_component);

        let run = WorkerRun {
            id,
            descriptor: descriptor.clone(),
            connector,
            stop: Arc::clone(&stop),
            sink: Arc::clone(&sink),
            config,
            events,
        };

        let thread = thread::Builder::new()
            .name(format!("gcslink-worker-{id}"))
            .spawn(move || run.run())
            .map_err(LinkError::WorkerSpawn)?;

        debug!(worker = id, %descriptor, "link worker started");
        Ok(Self {
            id,
            descriptor,
            stop,
            sink,
            target_system,
            target_component,
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Ask the thread to exit. Observed within one poll interval.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the thread to exit.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(worker = self.id, "link worker panicked");
            }
        }
    }

    /// Stop tracking the thread. It keeps running until it next observes
    /// the stop flag.
    pub fn detach(mut self) {
        self.thread.take();
    }

    /// Queue a message on the outbound half. Returns `false` if the link is
    /// not open or the write failed.
    pub fn send(&self, message: &MavMessage) -> bool {
        let mut sink = self.sink.lock();
        let Some(sink) = sink.as_mut() else {
            debug!(worker = self.id, "send dropped: link not open");
            return false;
        };
        match sink.send(message) {
            Ok(()) => true,
            Err(err) => {
                debug!(worker = self.id, %err, "send failed");
                false
            }
        }
    }

    /// Send `COMMAND_LONG` to the configured target.
    pub fn send_command(&self, command: MavCmd, params: [f32; 7]) -> bool {
        self.send(&command_long(
            self.target_system,
            self.target_component,
            command,
            params,
        ))
    }

    /// Ask the vehicle to start streaming `stream_id` at `rate_hz`.
    pub fn request_data_stream(&self, stream_id: u8, rate_hz: u16) -> bool {
        self.send(&MavMessage::REQUEST_DATA_STREAM(REQUEST_DATA_STREAM_DATA {
            req_message_rate: rate_hz,
            target_system: self.target_system,
            target_component: self.target_component,
            req_stream_id: stream_id,
            start_stop: 1,
        }))
    }
}

impl Drop for LinkWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for LinkWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkWorker")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Build a `COMMAND_LONG` with confirmation 0.
pub fn command_long(
    target_system: u8,
    target_component: u8,
    command: MavCmd,
    params: [f32; 7],
) -> MavMessage {
    let [param1, param2, param3, param4, param5, param6, param7] = params;
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        param1,
        param2,
        param3,
        param4,
        param5,
        param6,
        param7,
        command,
        target_system,
        target_component,
        confirmation: 0,
    })
}

struct WorkerRun {
    id: WorkerId,
    descriptor: ConnectionDescriptor,
    connector: Arc<dyn Connector>,
    config: LinkConfig,
    stop: Arc<AtomicBool>,
    sink: SharedSink,
    events: EventSender,
}

impl WorkerRun {
    fn run(self) {
        let mut cleanup = Cleanup {
            id: self.id,
            events: self.events.clone(),
            source: None,
            sink: Arc::clone(&self.sink),
        };

        let Transport { source, sink } = match self.connector.open(&self.descriptor, &self.config)
        {
            Ok(transport) => transport,
            Err(err) => {
                warn!(worker = self.id, descriptor = %self.descriptor, %err, "connection failed");
                self.emit(WorkerEvent::ConnectionReady {
                    success: false,
                    message: format!("Connection failed: {err}"),
                });
                return;
            }
        };
        cleanup.source = Some(source);
        *self.sink.lock() = Some(sink);

        info!(worker = self.id, descriptor = %self.descriptor, "link open");
        self.emit(WorkerEvent::ConnectionReady {
            success: true,
            message: format!("Connected to {}", self.descriptor),
        });

        let mut liveness = Liveness::new(self.config.heartbeat_timeout);
        while !self.stop.load(Ordering::Acquire) {
            let Some(source) = cleanup.source.as_mut() else {
                break;
            };
            match source.receive() {
                Ok(Some(frame)) => self.handle_frame(&frame, &mut liveness),
                Ok(None) => {}
                Err(FrameError::ConnectionClosed) => {
                    if liveness.mark_lost() {
                        self.emit(WorkerEvent::LinkStatusChanged(false));
                    }
                    info!(worker = self.id, "link closed by peer");
                    self.emit(WorkerEvent::Error(format!(
                        "link closed: {}",
                        self.descriptor
                    )));
                    break;
                }
                Err(err) => {
                    debug!(worker = self.id, %err, "read failed");
                    thread::sleep(self.config.read_error_backoff);
                }
            }

            if liveness.check(Instant::now()) {
                info!(worker = self.id, "heartbeat lost");
                self.emit(WorkerEvent::LinkStatusChanged(false));
            }
        }

        debug!(worker = self.id, "link worker exiting");
    }

    fn handle_frame(&self, frame: &RawFrame, liveness: &mut Liveness) {
        let message = match TelemetryMessage::decode(frame) {
            Ok(message) => message,
            Err(err) => {
                trace!(worker = self.id, %err, "dropping undecodable frame");
                return;
            }
        };

        if let Some(info) = HeartbeatInfo::from_message(&message) {
            if liveness.heartbeat(Instant::now()) {
                info!(
                    worker = self.id,
                    system = info.system_id,
                    "heartbeat received, link up"
                );
                self.emit(WorkerEvent::LinkStatusChanged(true));
            }
            self.emit(WorkerEvent::Heartbeat(info));
        }

        if let Some(euler) = message.euler_angles() {
            self.emit(WorkerEvent::Attitude(euler));
        }

        self.emit(WorkerEvent::Message(message));
    }

    fn emit(&self, event: WorkerEvent) {
        // The manager may already be gone.
        let _ = self.events.send((self.id, event));
    }
}

/// Releases the transport and reports `Finished` on every exit path,
/// including unwinding.
struct Cleanup {
    id: WorkerId,
    events: EventSender,
    source: Option<Box<dyn FrameSource>>,
    sink: SharedSink,
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
        if let Some(mut sink) = self.sink.lock().take() {
            sink.close();
        }
        let _ = self.events.send((self.id, WorkerEvent::Finished));
    }
}
