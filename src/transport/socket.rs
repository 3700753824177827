//! UDP socket wrapper for the tunnel session.
//!
//! Provides a non-blocking receive path suited to a polling relay loop and
//! a send path bound to the single tunnel server.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use tokio::net::UdpSocket;

use crate::core::RECV_BUFFER_SIZE;

/// UDP socket talking to one tunnel server.
///
/// Datagrams are accepted from any source; the session's decryption and
/// frame checks decide what is kept.
#[derive(Debug)]
pub struct TunnelSocket {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// Where every datagram is sent.
    server_addr: SocketAddrV4,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
}

impl TunnelSocket {
    /// Bind an ephemeral IPv4 port for talking to `server_addr`.
    pub async fn bind(server_addr: SocketAddrV4) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
        Ok(Self::from_socket(socket, server_addr))
    }

    /// Wrap an existing UDP socket.
    pub fn from_socket(socket: UdpSocket, server_addr: SocketAddrV4) -> Self {
        Self {
            socket,
            server_addr,
            recv_buffer: vec![0u8; RECV_BUFFER_SIZE],
        }
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Get the server address.
    pub fn server_addr(&self) -> SocketAddrV4 {
        self.server_addr
    }

    /// Send one datagram to the server.
    pub async fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send_to(data, self.server_addr).await
    }

    /// Try to receive one datagram without blocking.
    ///
    /// Returns `Ok(None)` if no data is available.
    pub fn try_recv(&mut self) -> io::Result<Option<&[u8]>> {
        match self.socket.try_recv_from(&mut self.recv_buffer) {
            Ok((len, _from)) => Ok(Some(&self.recv_buffer[..len])),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn recv_eventually(socket: &mut TunnelSocket) -> Vec<u8> {
        for _ in 0..500 {
            if let Some(data) = socket.try_recv().unwrap() {
                return data.to_vec();
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("no datagram received");
    }

    #[tokio::test]
    async fn test_socket_bind() {
        let socket = TunnelSocket::bind("127.0.0.1:9".parse().unwrap()).await.unwrap();
        let addr = socket.local_addr().unwrap();
        assert!(addr.port() != 0);
        assert_eq!(socket.server_addr().port(), 9);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let mut socket = TunnelSocket::bind("127.0.0.1:9".parse().unwrap()).await.unwrap();
        assert!(socket.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_and_try_recv() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(server_addr) = server.local_addr().unwrap() else {
            unreachable!("bound to an IPv4 address");
        };

        let mut client = TunnelSocket::bind(server_addr).await.unwrap();
        client.send(b"hello tunnel").await.unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hello tunnel");

        let reply_to = SocketAddr::from((Ipv4Addr::LOCALHOST, from.port()));
        server.send_to(b"reply", reply_to).await.unwrap();
        assert_eq!(recv_eventually(&mut client).await, b"reply");
    }
}
