//! CSV recording of every message passing through a broker.
//!
//! Each session writes one file named `gcslink_log_<YYYYmmdd_HHMMSS>.csv`
//! (with a `_<n>` suffix if that name is taken) containing:
//!
//! ```text
//! timestamp,msg_type,fields
//! 0.012345,HEARTBEAT,"{""autopilot"":""MAV_AUTOPILOT_ARDUPILOTMEGA"",...}"
//! ```
//!
//! `timestamp` is seconds since the session started. `fields` is the
//! message as a JSON object without its type tag.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcslink_frame::TelemetryMessage;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::broker::{MessageBroker, Subscriber};
use crate::error::{BrokerError, Result};

pub const LOG_HEADER: &str = "timestamp,msg_type,fields";

/// Rows between forced flushes.
pub const FLUSH_EVERY_ROWS: u64 = 100;

/// Longest time rows may sit in the write buffer.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

const MAX_NAME_ATTEMPTS: u32 = 1000;

struct Session {
    path: PathBuf,
    writer: BufWriter<File>,
    started: Instant,
    last_flush: Instant,
    last_offset: f64,
    rows: u64,
}

impl Session {
    fn write_row(&mut self, message: &TelemetryMessage) -> Result<()> {
        let fields = serde_json::to_string(&message.fields())?;
        // Never write a timestamp below the previous row's.
        let offset = self.started.elapsed().as_secs_f64().max(self.last_offset);
        self.last_offset = offset;

        writeln!(
            self.writer,
            "{offset:.6},{},{}",
            message.type_name(),
            csv_quote(&fields)
        )?;
        self.rows += 1;

        if self.rows % FLUSH_EVERY_ROWS == 0 || self.last_flush.elapsed() >= FLUSH_INTERVAL {
            self.writer.flush()?;
            self.last_flush = Instant::now();
        }
        Ok(())
    }
}

/// Records a broker's traffic to CSV between [`start`](Self::start) and
/// [`stop`](Self::stop).
///
/// Write failures are logged and the session keeps going; the broker
/// never sees them as anything but a failed delivery.
pub struct SessionLogger {
    dir: PathBuf,
    session: Arc<Mutex<Option<Session>>>,
    subscription: Option<(Arc<MessageBroker>, Subscriber)>,
    last_path: Option<PathBuf>,
    last_rows: u64,
}

impl SessionLogger {
    /// A logger writing into `dir`. Nothing is created until `start`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            session: Arc::new(Mutex::new(None)),
            subscription: None,
            last_path: None,
            last_rows: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open a new log file and subscribe to every message on `broker`.
    ///
    /// Returns the path being written. Calling this while already logging
    /// returns the current path and changes nothing.
    pub fn start(&mut self, broker: &Arc<MessageBroker>) -> Result<PathBuf> {
        if let Some(path) = self.session.lock().as_ref().map(|s| s.path.clone()) {
            return Ok(path);
        }

        fs::create_dir_all(&self.dir).map_err(|source| BrokerError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (path, file) = create_log_file(&self.dir, &stamp)?;

        let mut writer = BufWriter::new(file);
        writeln!(writer, "{LOG_HEADER}")?;
        writer.flush()?;

        let now = Instant::now();
        *self.session.lock() = Some(Session {
            path: path.clone(),
            writer,
            started: now,
            last_flush: now,
            last_offset: 0.0,
            rows: 0,
        });

        let session = Arc::clone(&self.session);
        let subscriber = Subscriber::new(move |message| {
            let mut guard = session.lock();
            match guard.as_mut() {
                Some(session) => session.write_row(message).map_err(Into::into),
                None => Ok(()),
            }
        })
        .named("session-logger");
        broker.subscribe_all(&subscriber);
        self.subscription = Some((Arc::clone(broker), subscriber));
        self.last_path = Some(path.clone());
        self.last_rows = 0;

        info!(path = %path.display(), "session logging started");
        Ok(path)
    }

    /// Unsubscribe, flush and close the file. Returns the number of rows
    /// written in the session. Does nothing when not logging.
    pub fn stop(&mut self) -> Result<u64> {
        if let Some((broker, subscriber)) = self.subscription.take() {
            broker.unsubscribe_all(&subscriber);
        }
        let Some(mut session) = self.session.lock().take() else {
            return Ok(0);
        };

        self.last_rows = session.rows;
        let flushed = session.writer.flush();
        info!(
            path = %session.path.display(),
            rows = session.rows,
            "session logging stopped"
        );
        flushed?;
        Ok(session.rows)
    }

    pub fn is_logging(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Path of the current session, or of the last one after `stop`.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.last_path.clone()
    }

    /// Rows written in the current or most recent session.
    pub fn rows_written(&self) -> u64 {
        self.session
            .lock()
            .as_ref()
            .map_or(self.last_rows, |s| s.rows)
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "failed to close session log");
        }
    }
}

impl std::fmt::Debug for SessionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLogger")
            .field("dir", &self.dir)
            .field("logging", &self.is_logging())
            .field("log_path", &self.last_path)
            .finish()
    }
}

fn create_log_file(dir: &Path, stamp: &str) -> Result<(PathBuf, File)> {
    for n in 0..MAX_NAME_ATTEMPTS {
        let name = if n == 0 {
            format!("gcslink_log_{stamp}.csv")
        } else {
            format!("gcslink_log_{stamp}_{n}.csv")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "log file exists, trying next name");
            }
            Err(source) => return Err(BrokerError::CreateFile { path, source }),
        }
    }
    Err(BrokerError::CreateFile {
        path: dir.join(format!("gcslink_log_{stamp}.csv")),
        source: io::Error::new(ErrorKind::AlreadyExists, "no free log file name"),
    })
}

fn csv_quote(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
