//! Scripted transport for exercising the prober without a raw socket.

use std::collections::VecDeque;
use std::io;

use tokio::time::{sleep_until, Instant};

use super::IcmpTransport;
use crate::core::ProbeIdentity;
use crate::protocol::EchoMessage;

/// One scripted inbound event
#[derive(Debug)]
enum Inbound {
    Datagram(Vec<u8>),
    Error(io::ErrorKind),
}

/// Transport that replays datagrams at fixed instants
///
/// Meant for tests running on a paused tokio clock.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    inbound: VecDeque<(Instant, Inbound)>,
    send_failures: VecDeque<bool>,
    /// Every message passed to `send`, failed sends included
    pub sent: Vec<Vec<u8>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `bytes` at `at`
    pub fn push_datagram(&mut self, at: Instant, bytes: impl Into<Vec<u8>>) {
        self.inbound.push_back((at, Inbound::Datagram(bytes.into())));
    }

    /// Delivers a matching-format echo reply at `at`
    pub fn push_reply(&mut self, at: Instant, identity: ProbeIdentity) {
        let request = EchoMessage::request(identity, &b"RTO-PING"[..]);
        let reply = EchoMessage::reply_to(&request);
        self.push_datagram(at, reply.to_bytes().to_vec());
    }

    /// Fails the receive pending at `at`
    pub fn push_error(&mut self, at: Instant, kind: io::ErrorKind) {
        self.inbound.push_back((at, Inbound::Error(kind)));
    }

    /// Scripts the outcome of upcoming sends; unscripted sends succeed
    pub fn fail_sends(&mut self, pattern: &[bool]) {
        self.send_failures.extend(pattern.iter().copied());
    }

    /// Sequence numbers of every message sent so far
    pub fn sent_sequences(&self) -> Vec<u16> {
        self.sent
            .iter()
            .map(|bytes| EchoMessage::parse(bytes).map(|m| m.sequence).unwrap_or_default())
            .collect()
    }
}

impl IcmpTransport for ScriptedTransport {
    async fn send(&mut self, message: &[u8]) -> io::Result<()> {
        self.sent.push(message.to_vec());
        if self.send_failures.pop_front().unwrap_or(false) {
            return Err(io::Error::new(io::ErrorKind::Other, "network unreachable"));
        }
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(&(at, _)) = self.inbound.front() else {
            // Nothing left to deliver; only the caller's deadline ends this
            return std::future::pending().await;
        };

        // Stays queued if the caller gives up first, like a real socket buffer
        sleep_until(at).await;
        let Some((_, inbound)) = self.inbound.pop_front() else {
            return std::future::pending().await;
        };

        match inbound {
            Inbound::Datagram(bytes) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            Inbound::Error(kind) => Err(io::Error::new(kind, "scripted receive failure")),
        }
    }
}
