use tracing::info;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// A serial port discovered on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path (`/dev/ttyUSB0`, `COM3`).
    pub name: String,
    /// Human-readable description, e.g. USB manufacturer and product.
    pub description: String,
}

/// Open a serial device at `baud_rate` with 8N1 framing.
pub fn open(path: &str, baud_rate: u32, config: &TransportConfig) -> Result<LinkStream> {
    let port = serialport::new(path, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(|source| TransportError::Serial {
            path: path.to_string(),
            baud_rate,
            source,
        })?;

    info!(path, baud_rate, "opened serial port");
    Ok(LinkStream::from_serial(port))
}

/// List serial ports, most likely telemetry devices (USB) first.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(std::io::Error::from)?;
    let mut out: Vec<(bool, PortInfo)> = ports
        .into_iter()
        .map(|port| {
            let (is_usb, description) = describe(&port.port_type);
            (
                is_usb,
                PortInfo {
                    name: port.port_name,
                    description,
                },
            )
        })
        .collect();
    out.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    Ok(out.into_iter().map(|(_, info)| info).collect())
}

fn describe(port_type: &serialport::SerialPortType) -> (bool, String) {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            let label = match (&usb.manufacturer, &usb.product) {
                (Some(m), Some(p)) => format!("{m} {p}"),
                (None, Some(p)) => p.clone(),
                (Some(m), None) => m.clone(),
                (None, None) => "USB serial".to_string(),
            };
            (true, format!("{label} ({:04x}:{:04x})", usb.vid, usb.pid))
        }
        serialport::SerialPortType::PciPort => (false, "PCI serial".to_string()),
        serialport::SerialPortType::BluetoothPort => (false, "Bluetooth serial".to_string()),
        serialport::SerialPortType::Unknown => (false, "serial".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_missing_device_is_serial_error() {
        let result = open(
            "/dev/gcslink-does-not-exist",
            57_600,
            &TransportConfig::default(),
        );
        let err = result.unwrap_err();
        assert!(matches!(err, TransportError::Serial { baud_rate: 57_600, .. }));
        assert!(err.is_open_failure());
    }

    #[test]
    fn open_dispatches_on_descriptor() {
        let descriptor = crate::ConnectionDescriptor::serial("/dev/gcslink-missing", 115_200);
        let result = crate::open(&descriptor, &TransportConfig::default());
        assert!(matches!(result, Err(TransportError::Serial { .. })));
    }
}
