use serde_json::json;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("gcslink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let build = json!({
        "name": "gcslink",
        "version": env!("CARGO_PKG_VERSION"),
        "target": option_env!("GCSLINK_BUILD_TARGET").unwrap_or("unknown"),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "git_hash": option_env!("GIT_HASH").unwrap_or("unknown"),
        "mavlink_dialect": "common",
        "mavlink_versions": ["v1", "v2"],
    });
    print_record(&build, format);
    Ok(SUCCESS)
}
