//! Publish/subscribe fan-out for decoded telemetry, plus a CSV session
//! logger built on top of it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gcslink_broker::{MessageBroker, SessionLogger, Subscriber};
//!
//! let broker = Arc::new(MessageBroker::new());
//! let printer = Subscriber::from_fn(|msg| println!("{}", msg.type_name()));
//! broker.subscribe("HEARTBEAT", &printer);
//!
//! let mut logger = SessionLogger::new("logs");
//! let path = logger.start(&broker)?;
//! println!("logging to {}", path.display());
//! # Ok::<(), gcslink_broker::BrokerError>(())
//! ```

pub mod broker;
pub mod error;
pub mod logger;

pub use broker::{MessageBroker, Subscriber};
pub use error::{BrokerError, Result, SubscriberError};
pub use logger::{SessionLogger, FLUSH_EVERY_ROWS, FLUSH_INTERVAL, LOG_HEADER};
