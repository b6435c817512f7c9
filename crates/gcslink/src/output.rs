use std::io::IsTerminal;
use std::time::UNIX_EPOCH;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gcslink_frame::TelemetryMessage;
use gcslink_transport::PortInfo;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    msg_type: &'a str,
    msg_id: u32,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    timestamp: f64,
    fields: Value,
}

pub fn print_message(message: &TelemetryMessage, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                msg_type: message.type_name(),
                msg_id: message.message_id(),
                system_id: message.system_id(),
                component_id: message.component_id(),
                sequence: message.sequence(),
                timestamp: unix_seconds(message),
                fields: message.fields(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SYS", "COMP", "SEQ", "FIELDS"])
                .add_row(vec![
                    message.type_name().to_string(),
                    message.system_id().to_string(),
                    message.component_id().to_string(),
                    message.sequence().to_string(),
                    fields_preview(&message.fields()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} sys={} comp={} seq={} {}",
                message.type_name(),
                message.system_id(),
                message.component_id(),
                message.sequence(),
                fields_preview(&message.fields())
            );
        }
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    description: &'a str,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.name,
                    description: &port.description,
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "DESCRIPTION"]);
            for port in ports {
                table.add_row(vec![port.name.clone(), port.description.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                println!("{}  {}", port.name, port.description);
            }
        }
    }
}

/// Print a single JSON object, or `key=value` pairs otherwise.
pub fn print_record(record: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{record}"),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["FIELD", "VALUE"]);
            if let Value::Object(map) = record {
                for (key, value) in map {
                    table.add_row(vec![key.clone(), scalar(value)]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", fields_preview(record)),
    }
}

fn fields_preview(fields: &Value) -> String {
    match fields {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{key}={}", scalar(value)))
            .collect::<Vec<_>>()
            .join(" "),
        other => scalar(other),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        // Enum fields serialise as {"type": "NAME"}.
        Value::Object(map) if map.len() == 1 => match map.get("type") {
            Some(Value::String(s)) => s.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

fn unix_seconds(message: &TelemetryMessage) -> f64 {
    message
        .received_at()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preview_flattens_enum_tags() {
        let fields = json!({
            "mavtype": {"type": "MAV_TYPE_QUADROTOR"},
            "custom_mode": 4,
        });
        assert_eq!(fields_preview(&fields), "custom_mode=4 mavtype=MAV_TYPE_QUADROTOR");
    }

    #[test]
    fn preview_of_scalar_is_plain() {
        assert_eq!(fields_preview(&json!("text")), "text");
        assert_eq!(fields_preview(&json!(1.5)), "1.5");
    }
}
