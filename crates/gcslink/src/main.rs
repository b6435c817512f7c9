mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFilter, LogFormat};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "gcslink", version, about = "MAVLink ground link CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        env = "GCSLINK_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    /// Log level for stderr, optionally per component
    /// (e.g. debug, or warn,link=trace). Components: cli, transport, frame, link, broker.
    #[arg(
        long,
        value_name = "FILTER",
        default_value = "info",
        env = "GCSLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogFilter,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
