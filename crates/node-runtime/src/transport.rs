//! The UDP endpoint.
//!
//! A thin wrapper over one `tokio::net::UdpSocket` with broadcast enabled.
//! It only shuttles bytes: all protocol state lives in
//! [`crate::node::MeshNode`], which never touches a socket.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::warn;

use crate::node::Outgoing;

/// Largest datagram we will accept off the wire.
pub const RECV_BUFFER_BYTES: usize = 65_536;

/// One bound UDP socket.
pub struct UdpEndpoint {
    socket: UdpSocket,
}

impl UdpEndpoint {
    pub async fn bind(host: &str, port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind((host, port)).await?;
        socket.set_broadcast(true)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive one datagram into `buf`; returns the filled length and the
    /// source address.
    pub async fn recv(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    /// Put one queued frame on the wire. Send errors are logged and
    /// swallowed; the mesh treats the network as lossy anyway.
    pub async fn send(&self, outgoing: &Outgoing) {
        let result = match outgoing {
            Outgoing::Unicast { addr, bytes } => self.socket.send_to(bytes, addr).await,
            Outgoing::Broadcast { port, bytes } => {
                self.socket
                    .send_to(bytes, (Ipv4Addr::BROADCAST, *port))
                    .await
            }
        };
        if let Err(err) = result {
            warn!(%err, "udp send failed");
        }
    }
}
