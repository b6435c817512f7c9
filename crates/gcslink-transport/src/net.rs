use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};

use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Bind a local UDP socket and wait for the vehicle to send first.
///
/// This is a listen-style link: nothing is sent until a datagram arrives,
/// and the first sender becomes the reply address for the lifetime of the
/// stream.
pub fn bind_udp(host: &str, port: u16, config: &TransportConfig) -> Result<LinkStream> {
    let addr_label = format!("{host}:{port}");
    let addr = resolve(host, port)
        .map_err(|source| TransportError::Bind {
            addr: addr_label.clone(),
            source,
        })?
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Bind {
            addr: addr_label.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "host resolved to no addresses",
            ),
        })?;

    let socket = UdpSocket::bind(addr).map_err(|source| TransportError::Bind {
        addr: addr_label,
        source,
    })?;

    let mut stream = LinkStream::from_udp(socket);
    stream.set_read_timeout(config.read_timeout)?;
    stream.set_write_timeout(config.write_timeout)?;

    info!(addr = ?stream.local_addr(), "listening for udp telemetry");
    Ok(stream)
}

/// Connect to a TCP endpoint, trying each resolved address in turn.
pub fn connect_tcp(host: &str, port: u16, config: &TransportConfig) -> Result<LinkStream> {
    let addr_label = format!("{host}:{port}");
    let addrs = resolve(host, port).map_err(|source| TransportError::Connect {
        addr: addr_label.clone(),
        source,
    })?;

    let mut last_err = std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "host resolved to no addresses",
    );
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, config.connect_timeout) {
            Ok(tcp) => {
                let _ = tcp.set_nodelay(true);
                let mut stream = LinkStream::from_tcp(tcp);
                stream.set_read_timeout(config.read_timeout)?;
                stream.set_write_timeout(config.write_timeout)?;
                info!(%addr, "connected over tcp");
                return Ok(stream);
            }
            Err(err) => {
                debug!(%addr, error = %err, "tcp connect attempt failed");
                last_err = err;
            }
        }
    }

    Err(TransportError::Connect {
        addr: addr_label,
        source: last_err,
    })
}

fn resolve(host: &str, port: u16) -> std::io::Result<Vec<SocketAddr>> {
    Ok((host, port).to_socket_addrs()?.collect())
}

#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    use super::*;

    #[test]
    fn udp_adopts_first_sender_as_peer() {
        let mut link = bind_udp("127.0.0.1", 0, &TransportConfig::default()).unwrap();
        let link_addr = link.local_addr().unwrap();
        assert!(link.peer_addr().is_none());

        let vehicle = UdpSocket::bind("127.0.0.1:0").unwrap();
        vehicle
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        vehicle.send_to(b"hello", link_addr).unwrap();

        let mut buf = [0u8; 64];
        let n = read_with_retry(&mut link, &mut buf);
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(link.peer_addr(), Some(vehicle.local_addr().unwrap()));

        link.write_all(b"reply").unwrap();
        let (n, _) = vehicle.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"reply");
    }

    #[test]
    fn udp_write_before_peer_fails() {
        let mut link = bind_udp("127.0.0.1", 0, &TransportConfig::default()).unwrap();
        let err = link.write(b"too early").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn udp_read_times_out_without_blocking() {
        let config = TransportConfig::default().with_read_timeout(Duration::from_millis(20));
        let mut link = bind_udp("127.0.0.1", 0, &config).unwrap();
        let mut buf = [0u8; 16];
        let err = link.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::WouldBlock | ErrorKind::TimedOut
        ));
    }

    #[test]
    fn udp_clone_shares_peer() {
        let mut link = bind_udp("127.0.0.1", 0, &TransportConfig::default()).unwrap();
        let writer = link.try_clone().unwrap();

        let vehicle = UdpSocket::bind("127.0.0.1:0").unwrap();
        vehicle.send_to(b"x", link.local_addr().unwrap()).unwrap();
        let mut buf = [0u8; 4];
        read_with_retry(&mut link, &mut buf);

        assert_eq!(writer.peer_addr(), Some(vehicle.local_addr().unwrap()));
    }

    #[test]
    fn tcp_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            peer.read_exact(&mut buf).unwrap();
            peer.write_all(&buf).unwrap();
        });

        let mut link = connect_tcp("127.0.0.1", port, &TransportConfig::default()).unwrap();
        link.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        let mut got = 0;
        while got < 4 {
            got += read_with_retry(&mut link, &mut buf[got..]);
        }
        assert_eq!(&buf, b"ping");

        server.join().unwrap();
        link.shutdown();
        link.shutdown();
    }

    #[test]
    fn tcp_connect_refused_is_connect_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = connect_tcp("127.0.0.1", port, &TransportConfig::default());
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    fn read_with_retry(link: &mut LinkStream, buf: &mut [u8]) -> usize {
        for _ in 0..100 {
            match link.read(buf) {
                Ok(n) => return n,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue
                }
                Err(err) => panic!("unexpected read error: {err}"),
            }
        }
        panic!("no data within retry budget");
    }
}
