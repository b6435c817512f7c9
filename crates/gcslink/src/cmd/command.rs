use std::time::{Duration, Instant};

use gcslink_frame::dialect::MavCmd;
use gcslink_link::{command_long, HeartbeatInfo, LinkEvent, LinkManager};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cmd::{parse_descriptor, parse_duration, CommandArgs};
use crate::exit::{link_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, TRANSPORT_ERROR, USAGE};
use crate::output::{print_record, OutputFormat};

const POLL: Duration = Duration::from_millis(100);

pub fn run(args: CommandArgs, format: OutputFormat) -> CliResult<i32> {
    let descriptor = parse_descriptor(&args.descriptor)?;
    let command = parse_command(&args.command)?;
    let wait = parse_duration(&args.wait_heartbeat)?;

    let mut manager = LinkManager::new();
    manager
        .connect(descriptor)
        .map_err(|err| link_error("connect failed", err))?;

    let heartbeat = wait_for_heartbeat(&mut manager, wait)?;
    let target_system = args.target_system.unwrap_or(heartbeat.system_id);
    let target_component = args.target_component.unwrap_or(heartbeat.component_id);
    debug!(
        vehicle = ?heartbeat.vehicle_type,
        target_system,
        target_component,
        "vehicle found"
    );

    let message = command_long(target_system, target_component, command, args.params());
    let sent = manager.send(&message);
    manager.disconnect();

    if !sent {
        return Err(CliError::new(FAILURE, format!("failed to send {command:?}")));
    }
    info!(command = ?command, target_system, target_component, "command sent");

    let params: Vec<Value> = args.params().iter().map(|p| json!(p)).collect();
    print_record(
        &json!({
            "command": format!("{command:?}"),
            "target_system": target_system,
            "target_component": target_component,
            "params": params,
            "sent": true,
        }),
        format,
    );
    Ok(SUCCESS)
}

fn wait_for_heartbeat(manager: &mut LinkManager, wait: Duration) -> CliResult<HeartbeatInfo> {
    let deadline = Instant::now() + wait;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("no heartbeat within {}ms", wait.as_millis()),
            ));
        }

        for event in manager.poll_events((deadline - now).min(POLL)) {
            match event {
                LinkEvent::ConnectionAttemptFinished { success: false, message } => {
                    return Err(CliError::new(TRANSPORT_ERROR, message));
                }
                LinkEvent::HeartbeatReceived(info) => return Ok(info),
                LinkEvent::ErrorOccurred(message) if manager.descriptor().is_none() => {
                    return Err(CliError::new(FAILURE, message));
                }
                _ => {}
            }
        }
    }
}

/// Resolve `ARM_DISARM`-style names against the dialect's command set.
fn parse_command(input: &str) -> CliResult<MavCmd> {
    let upper = input.trim().to_ascii_uppercase();
    let name = if upper.starts_with("MAV_CMD_") {
        upper
    } else {
        format!("MAV_CMD_{upper}")
    };

    // Dialect enums are internally tagged; accept a bare string too.
    serde_json::from_value(json!({ "type": name.as_str() }))
        .or_else(|_| serde_json::from_value(Value::String(name.clone())))
        .map_err(|_| CliError::new(USAGE, format!("unknown command: {input}")))
}
