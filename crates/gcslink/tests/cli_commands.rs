#![cfg(all(unix, feature = "cli"))]

mod support;

use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use gcslink::frame::dialect::{MavCmd, MavMessage};
use serde_json::Value;

use support::{free_udp_port, Vehicle};

fn gcslink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gcslink"));
    cmd.env_remove("GCSLINK_LOG_LEVEL")
        .env_remove("GCSLINK_LOG_FORMAT");
    cmd
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("try_wait").is_some() {
            return child.wait_with_output().expect("collect output");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            panic!("gcslink did not exit within {timeout:?}; stderr:\n{stderr}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn version_prints_package_version() {
    let output = gcslink().arg("version").output().expect("run gcslink");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("gcslink {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn invalid_descriptor_exits_with_usage() {
    let output = gcslink()
        .args(["monitor", "tcp:host:notaport"])
        .output()
        .expect("run gcslink");
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid link"), "{stderr}");
}

#[test]
fn unknown_command_exits_with_usage() {
    let output = gcslink()
        .args(["command", "udp:127.0.0.1:14550", "FLY_TO_THE_MOON"])
        .output()
        .expect("run gcslink");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn command_without_heartbeat_times_out() {
    let link = format!("udp:127.0.0.1:{}", free_udp_port());
    let output = gcslink()
        .args([
            "command",
            link.as_str(),
            "COMPONENT_ARM_DISARM",
            "--wait-heartbeat",
            "300ms",
        ])
        .output()
        .expect("run gcslink");
    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn monitor_prints_json_and_records_session() {
    let port = free_udp_port();
    let link = format!("udp:127.0.0.1:{port}");
    let logs = tempfile::tempdir().expect("tempdir");

    let child = gcslink()
        .args([
            "monitor",
            link.as_str(),
            "--types",
            "heartbeat",
            "--count",
            "3",
            "--format",
            "json",
            "--log-dir",
        ])
        .arg(logs.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn gcslink");

    let vehicle = Vehicle::new(port);
    let _beacon = vehicle.start_heartbeats(Duration::from_millis(30));
    let output = wait_with_timeout(child, Duration::from_secs(15));
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert!(lines.len() >= 3);
    for line in &lines {
        assert_eq!(line["msg_type"], "HEARTBEAT");
        assert_eq!(line["system_id"], 1);
    }

    let logs: Vec<_> = std::fs::read_dir(logs.path())
        .expect("read log dir")
        .filter_map(|entry| entry.ok())
        .collect();
    assert_eq!(logs.len(), 1);
    let contents = std::fs::read_to_string(logs[0].path()).expect("read log");
    assert!(contents.starts_with("timestamp,msg_type,fields"));
    assert!(contents.contains(",HEARTBEAT,"));
}

#[test]
fn command_reaches_the_vehicle() {
    let port = free_udp_port();
    let link = format!("udp:127.0.0.1:{port}");
    let child = gcslink()
        .args([
            "command",
            link.as_str(),
            "MAV_CMD_COMPONENT_ARM_DISARM",
            "--param1",
            "1",
            "--format",
            "json",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn gcslink");

    let vehicle = Vehicle::new(port);
    let beacon = vehicle.start_heartbeats(Duration::from_millis(30));

    let deadline = Instant::now() + Duration::from_secs(10);
    let command = loop {
        assert!(Instant::now() < deadline, "command never arrived");
        if let Some(message) = vehicle.recv(Duration::from_millis(50)) {
            if let MavMessage::COMMAND_LONG(data) = message.message() {
                break data.clone();
            }
        }
    };
    drop(beacon);

    assert_eq!(command.command, MavCmd::MAV_CMD_COMPONENT_ARM_DISARM);
    assert_eq!(command.param1, 1.0);
    assert_eq!((command.target_system, command.target_component), (1, 1));

    let output = wait_with_timeout(child, Duration::from_secs(10));
    assert!(output.status.success());
    let record: Value =
        serde_json::from_slice(&output.stdout).expect("command output should be json");
    assert_eq!(record["sent"], true);
    assert_eq!(record["command"], "MAV_CMD_COMPONENT_ARM_DISARM");
}
