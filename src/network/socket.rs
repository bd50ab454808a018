use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::io::unix::AsyncFd;
use tracing::debug;

use crate::core::{Error, Result};
use super::IcmpTransport;

/// Raw ICMPv4 socket registered with the tokio reactor
///
/// Opening one needs root or `CAP_NET_RAW`. Received datagrams include the
/// IPv4 header; sent messages are bare ICMP and the kernel adds the header.
#[derive(Debug)]
pub struct RawIcmpSocket {
    /// Non-blocking socket
    inner: AsyncFd<Socket>,
    /// Destination of every send
    destination: Ipv4Addr,
    /// Destination as a socket address
    destination_addr: SockAddr,
}

impl RawIcmpSocket {
    /// Opens a raw ICMP socket that sends to `destination`
    pub fn open(destination: Ipv4Addr) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                Error::network(format!(
                    "Failed to open raw ICMP socket (root or CAP_NET_RAW required): {}",
                    e
                ))
            } else {
                Error::network(format!("Failed to open raw ICMP socket: {}", e))
            }
        })?;

        socket
            .set_nonblocking(true)
            .map_err(|e| Error::network(format!("Failed to set non-blocking mode: {}", e)))?;

        let inner = AsyncFd::new(socket)
            .map_err(|e| Error::network(format!("Failed to register socket: {}", e)))?;

        debug!(%destination, "opened raw ICMP socket");

        Ok(RawIcmpSocket {
            inner,
            destination,
            destination_addr: SocketAddrV4::new(destination, 0).into(),
        })
    }

    /// Returns the destination address
    pub fn destination(&self) -> Ipv4Addr {
        self.destination
    }
}

impl IcmpTransport for RawIcmpSocket {
    async fn send(&mut self, message: &[u8]) -> io::Result<()> {
        loop {
            let mut guard = self.inner.writable().await?;
            let destination = &self.destination_addr;

            match guard.try_io(|inner| inner.get_ref().send_to(message, destination)) {
                Ok(Ok(sent)) if sent == message.len() => return Ok(()),
                Ok(Ok(sent)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short send: {} of {} bytes", sent, message.len()),
                    ))
                }
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.inner.readable().await?;

            match guard.try_io(|inner| {
                let mut socket: &Socket = inner.get_ref();
                socket.read(&mut *buf)
            }) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}
