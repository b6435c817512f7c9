use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use gcslink_transport::ConnectionDescriptor;

use crate::exit::{transport_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod command;
pub mod monitor;
pub mod ports;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and print telemetry, optionally recording a session log.
    Monitor(MonitorArgs),
    /// Connect, wait for a heartbeat and send one COMMAND_LONG.
    Command(CommandArgs),
    /// List serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Command(args) => command::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Link to open, e.g. udp:0.0.0.0:14550, tcp:127.0.0.1:5760, /dev/ttyUSB0:57600.
    pub descriptor: String,
    /// Only print these message types (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub types: Option<Vec<String>>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after this long (e.g. 30s, 500ms).
    #[arg(long)]
    pub duration: Option<String>,
    /// Record every message to a CSV session log in this directory.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    /// Rate requested for all data streams once connected.
    #[arg(long, value_name = "HZ", default_value = "50")]
    pub stream_rate: u16,
}

#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Link to open.
    pub descriptor: String,
    /// Command name, with or without the MAV_CMD_ prefix.
    pub command: String,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub param1: f32,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub param2: f32,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub param3: f32,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub param4: f32,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub param5: f32,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub param6: f32,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub param7: f32,
    /// Target system id. Default: the system that sent the first heartbeat.
    #[arg(long)]
    pub target_system: Option<u8>,
    /// Target component id. Default: the component that sent the first heartbeat.
    #[arg(long)]
    pub target_component: Option<u8>,
    /// How long to wait for a heartbeat before giving up (e.g. 5s).
    #[arg(long, default_value = "5s")]
    pub wait_heartbeat: String,
}

impl CommandArgs {
    pub fn params(&self) -> [f32; 7] {
        [
            self.param1,
            self.param2,
            self.param3,
            self.param4,
            self.param5,
            self.param6,
            self.param7,
        ]
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_descriptor(input: &str) -> CliResult<ConnectionDescriptor> {
    input
        .parse()
        .map_err(|err| transport_error("invalid link", err))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
