use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gcslink_frame::dialect::{MavCmd, MavDataStream, MavMessage};
use gcslink_transport::{ConnectionDescriptor, Protocol};
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::connector::{Connector, SystemConnector};
use crate::error::{LinkError, Result};
use crate::event::{LinkEvent, WorkerEvent, WorkerId};
use crate::heartbeat::HeartbeatInfo;
use crate::worker::LinkWorker;

const TEARDOWN_POLL: Duration = Duration::from_millis(10);

/// Coarse lifecycle state of a manager's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing attempted yet.
    Idle,
    /// A transport open is in flight.
    Connecting,
    /// Heartbeats are arriving.
    Connected,
    /// A link was attempted or lost and no heartbeats are arriving.
    Disconnected,
}

/// Owns at most one [`LinkWorker`] and turns its events into
/// [`LinkEvent`]s for the interactive side.
///
/// The manager never blocks on I/O. Worker events are buffered on a
/// channel and processed when the caller invokes [`poll_events`].
///
/// [`poll_events`]: LinkManager::poll_events
pub struct LinkManager {
    config: LinkConfig,
    connector: Arc<dyn Connector>,
    events_tx: Sender<(WorkerId, WorkerEvent)>,
    events_rx: Receiver<(WorkerId, WorkerEvent)>,
    worker: Option<LinkWorker>,
    next_worker_id: WorkerId,
    pending: VecDeque<LinkEvent>,
    is_connecting: bool,
    is_connected: bool,
    attempted: bool,
    stream_request_due: Option<Instant>,
    last_heartbeat: Option<HeartbeatInfo>,
}

impl LinkManager {
    pub fn new() -> Self {
        Self::with_config(LinkConfig::default())
    }

    pub fn with_config(config: LinkConfig) -> Self {
        Self::with_connector(config, Arc::new(SystemConnector))
    }

    /// Create a manager that opens links through `connector`.
    pub fn with_connector(config: LinkConfig, connector: Arc<dyn Connector>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            config,
            connector,
            events_tx,
            events_rx,
            worker: None,
            next_worker_id: 0,
            pending: VecDeque::new(),
            is_connecting: false,
            is_connected: false,
            attempted: false,
            stream_request_due: None,
            last_heartbeat: None,
        }
    }

    pub fn connect_serial(&mut self, device_path: &str, baud_rate: u32) -> Result<()> {
        self.connect(ConnectionDescriptor::serial(device_path, baud_rate))
    }

    pub fn connect_network(&mut self, host: &str, port: u16, protocol: Protocol) -> Result<()> {
        self.connect(ConnectionDescriptor::network(host, port, protocol))
    }

    /// Start a connection attempt in the background.
    ///
    /// Fails with [`LinkError::ConnectionInProgress`] while another attempt
    /// is still opening. Any existing link is torn down first. The outcome
    /// arrives later as [`LinkEvent::ConnectionAttemptFinished`].
    pub fn connect(&mut self, descriptor: ConnectionDescriptor) -> Result<()> {
        if self.is_connecting {
            warn!(%descriptor, "connect rejected: connection already in progress");
            self.pending.push_back(LinkEvent::ErrorOccurred(
                LinkError::ConnectionInProgress.to_string(),
            ));
            return Err(LinkError::ConnectionInProgress);
        }

        self.teardown_worker();
        self.stream_request_due = None;
        if self.is_connected {
            self.is_connected = false;
            self.pending.push_back(LinkEvent::LinkStatusChanged(false));
        }

        self.next_worker_id += 1;
        let id = self.next_worker_id;
        self.attempted = true;
        self.is_connecting = true;
        self.pending.push_back(LinkEvent::ConnectionAttemptStarted);
        info!(worker = id, %descriptor, "connecting");

        match LinkWorker::spawn(
            id,
            descriptor,
            Arc::clone(&self.connector),
            self.config.clone(),
            self.events_tx.clone(),
        ) {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(err) => {
                self.is_connecting = false;
                self.pending.push_back(LinkEvent::ConnectionAttemptFinished {
                    success: false,
                    message: format!("Connection failed: {err}"),
                });
                Err(err)
            }
        }
    }

    /// Tear down the current link. Safe to call at any time, any number of
    /// times.
    pub fn disconnect(&mut self) {
        let had_link = self.worker.is_some() || self.is_connecting || self.is_connected;
        self.is_connecting = false;
        self.stream_request_due = None;
        self.teardown_worker();
        self.is_connected = false;

        if had_link {
            info!("disconnected");
            self.pending.push_back(LinkEvent::LinkStatusChanged(false));
        }
    }

    /// Send a raw message. Returns `false` if no link is open or the write
    /// failed.
    pub fn send(&self, message: &MavMessage) -> bool {
        self.worker.as_ref().is_some_and(|w| w.send(message))
    }

    /// Send `COMMAND_LONG` to the configured target.
    pub fn send_command(&self, command: MavCmd, params: [f32; 7]) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.send_command(command, params))
    }

    pub fn request_stream(&self, stream_id: u8, rate_hz: u16) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.request_data_stream(stream_id, rate_hz))
    }

    pub fn request_all_streams(&self, rate_hz: u16) -> bool {
        self.request_stream(MavDataStream::MAV_DATA_STREAM_ALL as u8, rate_hz)
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn is_connecting(&self) -> bool {
        self.is_connecting
    }

    pub fn state(&self) -> LinkState {
        if self.is_connecting {
            LinkState::Connecting
        } else if self.is_connected {
            LinkState::Connected
        } else if self.attempted {
            LinkState::Disconnected
        } else {
            LinkState::Idle
        }
    }

    /// Descriptor of the current worker, if any.
    pub fn descriptor(&self) -> Option<&ConnectionDescriptor> {
        self.worker.as_ref().map(LinkWorker::descriptor)
    }

    pub fn last_heartbeat(&self) -> Option<&HeartbeatInfo> {
        self.last_heartbeat.as_ref()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Process worker events and return the resulting link events.
    ///
    /// Returns as soon as any event is available, otherwise blocks for at
    /// most `timeout`. Also fires the post-connect stream request once the
    /// settle delay has elapsed.
    pub fn poll_events(&mut self, timeout: Duration) -> Vec<LinkEvent> {
        let deadline = Instant::now() + timeout;
        let mut out: Vec<LinkEvent> = self.pending.drain(..).collect();

        self.drain_ready(&mut out);
        self.fire_stream_request_if_due();

        if out.is_empty() {
            let wake = match self.stream_request_due {
                Some(due) if due < deadline => due,
                _ => deadline,
            };
            let wait = wake.saturating_duration_since(Instant::now());
            if let Ok((id, event)) = self.events_rx.recv_timeout(wait) {
                self.handle_worker_event(id, event, &mut out);
                self.drain_ready(&mut out);
            }
            self.fire_stream_request_if_due();
        }

        out.extend(self.pending.drain(..));
        out
    }

    fn drain_ready(&mut self, out: &mut Vec<LinkEvent>) {
        while let Ok((id, event)) = self.events_rx.try_recv() {
            self.handle_worker_event(id, event, out);
        }
    }

    fn handle_worker_event(&mut self, id: WorkerId, event: WorkerEvent, out: &mut Vec<LinkEvent>) {
        if self.worker.as_ref().map(LinkWorker::id) != Some(id) {
            trace!(worker = id, ?event, "dropping event from stale worker");
            return;
        }

        match event {
            WorkerEvent::ConnectionReady { success, message } => {
                self.is_connecting = false;
                if success {
                    self.stream_request_due = Some(Instant::now() + self.config.settle_delay);
                } else {
                    warn!(worker = id, %message, "connection attempt failed");
                    self.teardown_worker();
                }
                out.push(LinkEvent::ConnectionAttemptFinished { success, message });
            }
            WorkerEvent::LinkStatusChanged(connected) => {
                self.is_connected = connected;
                out.push(LinkEvent::LinkStatusChanged(connected));
            }
            WorkerEvent::Heartbeat(info) => {
                self.last_heartbeat = Some(info.clone());
                out.push(LinkEvent::HeartbeatReceived(info));
            }
            WorkerEvent::Message(message) => out.push(LinkEvent::MessageReceived(message)),
            WorkerEvent::Attitude(euler) => out.push(LinkEvent::AttitudeReceived(euler)),
            WorkerEvent::Error(message) => out.push(LinkEvent::ErrorOccurred(message)),
            WorkerEvent::Finished => {
                debug!(worker = id, "reaping finished worker");
                if let Some(worker) = self.worker.take() {
                    worker.join();
                }
                self.is_connecting = false;
                self.stream_request_due = None;
                if self.is_connected {
                    self.is_connected = false;
                    out.push(LinkEvent::LinkStatusChanged(false));
                }
            }
        }
    }

    fn fire_stream_request_if_due(&mut self) {
        let Some(due) = self.stream_request_due else {
            return;
        };
        if Instant::now() < due {
            return;
        }
        self.stream_request_due = None;

        let rate = self.config.default_stream_rate_hz;
        if self.request_all_streams(rate) {
            debug!(rate_hz = rate, "requested all data streams");
        } else {
            debug!(rate_hz = rate, "stream request not sent");
        }
    }

    /// Stop the current worker, wait up to the teardown timeout, then
    /// either join it or leave it to exit on its own.
    fn teardown_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.stop();

        let deadline = Instant::now() + self.config.teardown_timeout;
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(TEARDOWN_POLL);
        }

        if worker.is_finished() {
            worker.join();
        } else {
            warn!(
                worker = worker.id(),
                timeout = ?self.config.teardown_timeout,
                "link worker did not stop in time, detaching"
            );
            worker.detach();
        }
    }
}

impl Default for LinkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LinkManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for LinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkManager")
            .field("state", &self.state())
            .field("worker", &self.worker)
            .finish()
    }
}
