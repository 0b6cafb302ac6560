//! Direct datagram delivery of framed packets.

use super::error::{FramerError, FramerResult};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use tracing::debug;

/// A connected, non-blocking UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `ip:port`.
    pub fn connect(ip: &str, port: u16) -> FramerResult<Self> {
        let address: IpAddr = ip
            .parse()
            .map_err(|_| FramerError::InvalidAddress(ip.to_string()))?;
        let local = match address {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let peer = SocketAddr::new(address, port);

        let socket = UdpSocket::bind(local)?;
        socket.connect(peer)?;
        socket.set_nonblocking(true)?;
        debug!(%peer, "datagram transport connected");

        Ok(Self { socket, peer })
    }

    /// Send one datagram. A full socket buffer is reported, not waited on.
    pub fn send(&self, datagram: &[u8]) -> FramerResult<usize> {
        Ok(self.socket.send(datagram)?)
    }

    /// The connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The bound local address.
    pub fn local_addr(&self) -> FramerResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_datagram_reaches_peer() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let transport = UdpTransport::connect("127.0.0.1", port).unwrap();
        assert_eq!(transport.peer_addr().port(), port);
        assert_eq!(transport.send(b"frame").unwrap(), 5);

        let mut buf = [0u8; 16];
        let (len, from) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"frame");
        assert_eq!(from, transport.local_addr().unwrap());
    }

    #[test]
    fn test_invalid_address_rejected() {
        assert!(matches!(
            UdpTransport::connect("not-an-ip", 9),
            Err(FramerError::InvalidAddress(_))
        ));
    }
}
