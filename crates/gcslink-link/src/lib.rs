//! Link lifecycle for a MAVLink vehicle.
//!
//! A [`LinkWorker`] owns one open transport on a background thread: it
//! receives frames, decodes them, tracks heartbeat liveness and reports
//! everything as events. A [`LinkManager`] owns at most one worker at a
//! time, rejects overlapping connection attempts, discards events from
//! workers it has already replaced, and hands [`LinkEvent`]s to the caller
//! through [`LinkManager::poll_events`].

pub mod config;
pub mod connector;
pub mod error;
pub mod event;
pub mod heartbeat;
pub mod manager;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::LinkConfig;
pub use connector::{Connector, FrameSink, FrameSource, SystemConnector, Transport};
pub use error::{LinkError, Result};
pub use event::{LinkEvent, WorkerEvent, WorkerId};
pub use gcslink_frame::{quaternion_to_euler, EulerAngles};
pub use heartbeat::{HeartbeatInfo, Liveness};
pub use manager::{LinkManager, LinkState};
pub use worker::{command_long, LinkWorker};
