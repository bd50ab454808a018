//! Network transport module
//!
//! This module provides the raw ICMP transport the prober sends through and
//! target resolution.

#[cfg(test)]
pub(crate) mod mock;
mod resolver;
mod socket;

pub use self::resolver::resolve_target;
pub use self::socket::RawIcmpSocket;

use std::future::Future;
use std::io;

/// Datagram transport for ICMP messages
///
/// Implementations deliver bare ICMP messages to a fixed destination and
/// return whatever datagrams arrive, unrelated traffic included. Read
/// deadlines are applied by the caller.
pub trait IcmpTransport {
    /// Sends one ICMP message to the destination
    fn send(&mut self, message: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Receives the next datagram into `buf`, returning its length
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}
