use std::str::FromStr;

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Short component names accepted in `--log-level` / `GCSLINK_LOG_LEVEL`.
const COMPONENTS: [(&str, &str); 5] = [
    ("cli", "gcslink"),
    ("transport", "gcslink_transport"),
    ("frame", "gcslink_frame"),
    ("link", "gcslink_link"),
    ("broker", "gcslink_broker"),
];

/// Which log events reach stderr.
///
/// Written as a base level with optional per-component overrides, e.g.
/// `info`, `debug,transport=warn` or `warn,link=trace`. The base level
/// applies to the gcslink crates; third-party crates are capped at `warn`
/// so a serial driver cannot drown out link diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct LogFilter {
    base: LevelFilter,
    overrides: Vec<(&'static str, LevelFilter)>,
}

impl LogFilter {
    pub fn base(&self) -> LevelFilter {
        self.base
    }

    pub fn targets(&self) -> Targets {
        let mut targets = Targets::new().with_default(self.base.min(LevelFilter::WARN));
        for (_, target) in COMPONENTS {
            targets = targets.with_target(target, self.base);
        }
        for (target, level) in &self.overrides {
            targets = targets.with_target(*target, *level);
        }
        targets
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            base: LevelFilter::INFO,
            overrides: Vec::new(),
        }
    }
}

impl FromStr for LogFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filter = LogFilter::default();
        for directive in s.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.split_once('=') {
                None => filter.base = parse_level(directive)?,
                Some((component, level)) => {
                    let target = resolve_component(component.trim())?;
                    filter.overrides.push((target, parse_level(level.trim())?));
                }
            }
        }
        Ok(filter)
    }
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    match s.to_ascii_lowercase().as_str() {
        "off" | "quiet" => Ok(LevelFilter::OFF),
        "error" => Ok(LevelFilter::ERROR),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(format!(
            "unknown log level '{other}' (expected off, error, warn, info, debug or trace)"
        )),
    }
}

fn resolve_component(name: &str) -> Result<&'static str, String> {
    COMPONENTS
        .iter()
        .find(|(short, target)| name.eq_ignore_ascii_case(short) || name == *target)
        .map(|(_, target)| *target)
        .ok_or_else(|| {
            let known: Vec<_> = COMPONENTS.iter().map(|(short, _)| *short).collect();
            format!("unknown log component '{name}' (expected {})", known.join(", "))
        })
}

/// Install the stderr subscriber. Telemetry output owns stdout.
///
/// Timestamps are seconds since start so log lines line up with the
/// monitor's elapsed time; thread names identify the link worker.
pub fn init_logging(format: LogFormat, filter: &LogFilter) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());
    let registry = tracing_subscriber::registry().with(filter.targets());

    let _ = match format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
}
