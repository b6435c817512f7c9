use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Default serial baud rate for telemetry radios and USB links.
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Default MAVLink ground station UDP/TCP port.
pub const DEFAULT_NETWORK_PORT: u16 = 14550;

/// Network protocol used for a [`ConnectionDescriptor::Network`] link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Bind locally and accept datagrams from whichever peer sends first.
    Udp,
    /// Connect out to `host:port`.
    Tcp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" | "udpin" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            other => Err(invalid(s, format!("unknown protocol {other:?}"))),
        }
    }
}

/// How to reach a peer.
///
/// Created per connection attempt and moved into the worker that owns the
/// link; it is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionDescriptor {
    Serial {
        device_path: String,
        baud_rate: u32,
    },
    Network {
        host: String,
        port: u16,
        protocol: Protocol,
    },
}

impl ConnectionDescriptor {
    pub fn serial(device_path: impl Into<String>, baud_rate: u32) -> Self {
        Self::Serial {
            device_path: device_path.into(),
            baud_rate,
        }
    }

    pub fn network(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self::Network {
            host: host.into(),
            port,
            protocol,
        }
    }

    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        Self::network(host, port, Protocol::Udp)
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::network(host, port, Protocol::Tcp)
    }

    /// Short transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Serial { .. } => "serial",
            Self::Network { protocol, .. } => protocol.as_str(),
        }
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial {
                device_path,
                baud_rate,
            } => write!(f, "serial:{device_path}:{baud_rate}"),
            Self::Network {
                host,
                port,
                protocol,
            } => {
                if host.contains(':') {
                    write!(f, "{protocol}:[{host}]:{port}")
                } else {
                    write!(f, "{protocol}:{host}:{port}")
                }
            }
        }
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = TransportError;

    /// Accepted forms:
    ///
    /// ```text
    /// serial:/dev/ttyUSB0[:57600]   /dev/ttyACM0[:115200]   COM4[:57600]
    /// udp:0.0.0.0[:14550]           tcp:127.0.0.1[:5760]    127.0.0.1:14550
    /// ```
    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty connection string"));
        }

        if let Some((scheme, rest)) = trimmed.split_once(':') {
            let scheme_lc = scheme.to_ascii_lowercase();
            match scheme_lc.as_str() {
                "serial" => return parse_serial(input, rest),
                "udp" | "udpin" | "tcp" => {
                    let protocol = scheme_lc.parse()?;
                    let (host, port) = parse_host_port(input, rest)?;
                    return Ok(Self::network(host, port, protocol));
                }
                _ => {}
            }
        }

        if looks_like_device(trimmed) {
            return parse_serial(input, trimmed);
        }

        let (host, port) = parse_host_port(input, trimmed)?;
        Ok(Self::udp(host, port))
    }
}

fn looks_like_device(s: &str) -> bool {
    let windows_com = s.len() > 3
        && s.is_char_boundary(3)
        && s[..3].eq_ignore_ascii_case("com")
        && s[3..].starts_with(|c: char| c.is_ascii_digit());
    s.starts_with('/') || s.starts_with("\\\\.\\") || windows_com
}

fn parse_serial(input: &str, rest: &str) -> Result<ConnectionDescriptor> {
    let (path, baud_rate) = match rest.rsplit_once(':') {
        Some((path, baud)) if !baud.is_empty() && baud.bytes().all(|b| b.is_ascii_digit()) => {
            let baud_rate: u32 = baud
                .parse()
                .map_err(|_| invalid(input, format!("invalid baud rate {baud:?}")))?;
            (path, baud_rate)
        }
        _ => (rest, DEFAULT_BAUD_RATE),
    };

    if path.is_empty() {
        return Err(invalid(input, "missing serial device path"));
    }
    if baud_rate == 0 {
        return Err(invalid(input, "baud rate must be greater than zero"));
    }

    Ok(ConnectionDescriptor::serial(path, baud_rate))
}

fn parse_host_port(input: &str, rest: &str) -> Result<(String, u16)> {
    let (host, port) = if let Some(stripped) = rest.strip_prefix('[') {
        let (host, tail) = stripped
            .split_once(']')
            .ok_or_else(|| invalid(input, "unterminated IPv6 address"))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => Some(port),
            None if tail.is_empty() => None,
            None => return Err(invalid(input, "unexpected text after IPv6 address")),
        };
        (host, port)
    } else {
        match rest.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (rest, None),
        }
    };

    if host.is_empty() {
        return Err(invalid(input, "missing host"));
    }

    let port = match port {
        Some(port) => port
            .parse::<u16>()
            .map_err(|_| invalid(input, format!("invalid port {port:?}")))?,
        None => DEFAULT_NETWORK_PORT,
    };

    Ok((host.to_string(), port))
}

fn invalid(input: &str, reason: impl Into<String>) -> TransportError {
    TransportError::InvalidDescriptor {
        input: input.to_string(),
        reason: reason.into(),
    }
}
