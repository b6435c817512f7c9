use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::info;

use crate::error::Result;

/// An open ground link. Implements `Read` and `Write`.
///
/// This is the fundamental I/O type returned by [`crate::open`]. Reads
/// honour the configured read timeout, surfacing `WouldBlock` or `TimedOut`
/// so the owning loop can poll its stop flag.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Serial(Box<dyn serialport::SerialPort>),
    Udp(UdpLink),
    Tcp(TcpStream),
}

struct UdpLink {
    socket: UdpSocket,
    /// First peer heard from; outbound frames go here. Shared between clones.
    peer: Arc<OnceLock<SocketAddr>>,
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.read(buf),
            LinkStreamInner::Tcp(stream) => stream.read(buf),
            LinkStreamInner::Udp(link) => {
                let (n, from) = link.socket.recv_from(buf)?;
                if link.peer.set(from).is_ok() {
                    info!(peer = %from, "adopted udp peer");
                }
                // An empty datagram is not end of stream.
                if n == 0 && !buf.is_empty() {
                    return Err(std::io::ErrorKind::WouldBlock.into());
                }
                Ok(n)
            }
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.write(buf),
            LinkStreamInner::Tcp(stream) => stream.write(buf),
            LinkStreamInner::Udp(link) => match link.peer.get() {
                Some(addr) => link.socket.send_to(buf, addr),
                None => Err(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "no udp peer has sent data yet",
                )),
            },
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.flush(),
            LinkStreamInner::Tcp(stream) => stream.flush(),
            LinkStreamInner::Udp(_) => Ok(()),
        }
    }
}

impl LinkStream {
    pub(crate) fn from_serial(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: LinkStreamInner::Serial(port),
        }
    }

    pub(crate) fn from_udp(socket: UdpSocket) -> Self {
        Self {
            inner: LinkStreamInner::Udp(UdpLink {
                socket,
                peer: Arc::new(OnceLock::new()),
            }),
        }
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: LinkStreamInner::Tcp(stream),
        }
    }

    /// Set the read timeout on the underlying device or socket.
    ///
    /// Serial ports share one timeout for reads and writes.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        let timeout = non_zero(timeout);
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port
                .set_timeout(timeout)
                .map_err(|err| std::io::Error::from(err).into()),
            LinkStreamInner::Udp(link) => link
                .socket
                .set_read_timeout(Some(timeout))
                .map_err(Into::into),
            LinkStreamInner::Tcp(stream) => {
                stream.set_read_timeout(Some(timeout)).map_err(Into::into)
            }
        }
    }

    /// Set the write timeout on network sockets. No-op for serial ports.
    pub fn set_write_timeout(&mut self, timeout: Duration) -> Result<()> {
        let timeout = non_zero(timeout);
        match &mut self.inner {
            LinkStreamInner::Serial(_) => Ok(()),
            LinkStreamInner::Udp(link) => link
                .socket
                .set_write_timeout(Some(timeout))
                .map_err(Into::into),
            LinkStreamInner::Tcp(stream) => {
                stream.set_write_timeout(Some(timeout)).map_err(Into::into)
            }
        }
    }

    /// Try to clone this stream. Both handles refer to the same device or socket.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            LinkStreamInner::Serial(port) => {
                let cloned = port.try_clone().map_err(std::io::Error::from)?;
                Ok(Self::from_serial(cloned))
            }
            LinkStreamInner::Udp(link) => Ok(Self {
                inner: LinkStreamInner::Udp(UdpLink {
                    socket: link.socket.try_clone()?,
                    peer: Arc::clone(&link.peer),
                }),
            }),
            LinkStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
        }
    }

    /// Shut the link down. Safe to call repeatedly and after partial failure.
    ///
    /// TCP sockets are shut down in both directions so every clone observes
    /// end of stream. Serial ports and UDP sockets close when the last handle
    /// is dropped.
    pub fn shutdown(&self) {
        if let LinkStreamInner::Tcp(stream) = &self.inner {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    /// The remote address, once known. Always `None` for serial ports.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            LinkStreamInner::Serial(_) => None,
            LinkStreamInner::Udp(link) => link.peer.get().copied(),
            LinkStreamInner::Tcp(stream) => stream.peer_addr().ok(),
        }
    }

    /// True for a UDP link that has not heard from any peer yet.
    pub fn awaiting_peer(&self) -> bool {
        matches!(&self.inner, LinkStreamInner::Udp(link) if link.peer.get().is_none())
    }

    /// The local socket address. Always `None` for serial ports.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            LinkStreamInner::Serial(_) => None,
            LinkStreamInner::Udp(link) => link.socket.local_addr().ok(),
            LinkStreamInner::Tcp(stream) => stream.local_addr().ok(),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            LinkStreamInner::Serial(_) => "serial",
            LinkStreamInner::Udp(_) => "udp",
            LinkStreamInner::Tcp(_) => "tcp",
        }
    }
}

// Sockets reject a zero timeout; treat it as the shortest one available.
fn non_zero(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::from_millis(1)
    } else {
        timeout
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &self.transport_name())
            .field("peer", &self.peer_addr())
            .finish()
    }
}
