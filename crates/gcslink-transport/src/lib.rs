//! Byte-stream transports for ground control links.
//!
//! Provides a unified stream over the ways a vehicle is usually reached:
//! - serial devices (USB telemetry radios, flight controller USB ports)
//! - UDP, bound locally and adopting the first peer that sends
//! - TCP, connecting out to a vehicle or a SITL instance
//!
//! This is the lowest layer of gcslink. Framing and decoding build on top
//! of the [`LinkStream`] type provided here.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod net;
pub mod serial;
pub mod stream;

pub use config::TransportConfig;
pub use descriptor::{ConnectionDescriptor, Protocol, DEFAULT_BAUD_RATE, DEFAULT_NETWORK_PORT};
pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo};
pub use stream::LinkStream;

/// Open a stream for the given descriptor.
///
/// Every blocking step is bounded by `config`: serial reads and TCP connects
/// carry timeouts, UDP binds return immediately.
pub fn open(descriptor: &ConnectionDescriptor, config: &TransportConfig) -> Result<LinkStream> {
    match descriptor {
        ConnectionDescriptor::Serial {
            device_path,
            baud_rate,
        } => serial::open(device_path, *baud_rate, config),
        ConnectionDescriptor::Network {
            host,
            port,
            protocol: Protocol::Udp,
        } => net::bind_udp(host, *port, config),
        ConnectionDescriptor::Network {
            host,
            port,
            protocol: Protocol::Tcp,
        } => net::connect_tcp(host, *port, config),
    }
}
