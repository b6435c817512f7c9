//! Core of a MAVLink ground control station.
//!
//! gcslink opens a serial, UDP or TCP link to a vehicle, runs it on a
//! background worker, watches heartbeats to decide whether the vehicle is
//! alive, and fans decoded telemetry out to subscribers. A session logger
//! can record everything that passes through the broker to CSV.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream transports and connection descriptors
//! - [`frame`]: MAVLink framing, decoding and typed telemetry messages
//! - [`link`]: link worker and manager, heartbeat liveness, link events
//! - [`broker`]: publish/subscribe fan-out and the CSV session logger
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gcslink::broker::MessageBroker;
//! use gcslink::link::{LinkEvent, LinkManager};
//!
//! let broker = Arc::new(MessageBroker::new());
//! let mut manager = LinkManager::new();
//! manager.connect("udp:0.0.0.0:14550".parse()?)?;
//! loop {
//!     for event in manager.poll_events(Duration::from_millis(100)) {
//!         if let LinkEvent::MessageReceived(message) = event {
//!             broker.publish(&message);
//!         }
//!     }
//! }
//! # #[allow(unreachable_code)]
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use gcslink_transport::*;
}

/// Re-export frame and message types.
pub mod frame {
    pub use gcslink_frame::*;
}

/// Re-export link lifecycle types.
pub mod link {
    pub use gcslink_link::*;
}

/// Re-export broker and session logger types.
pub mod broker {
    pub use gcslink_broker::*;
}
