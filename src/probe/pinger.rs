use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::{timeout_at, Instant};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::core::{
    Error, PingConfig, ProbeIdentity, DEFAULT_PAYLOAD, DEFAULT_RECV_BUFFER_SIZE,
};
use crate::network::IcmpTransport;
use crate::protocol::{EchoKind, EchoMessage, IcmpCodec};
use super::ProbeOutcome;

/// Stand-in deadline for timeouts too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Sends echo requests and matches their replies
///
/// One probe is in flight at a time: `probe` takes `&mut self`, so the
/// sequence counter needs no synchronization. Allowing concurrent probes
/// would need an atomic counter and demultiplexing replies across every
/// outstanding (identifier, sequence) pair.
#[derive(Debug)]
pub struct Pinger<T> {
    /// Transport to the destination
    transport: T,
    /// Identifier placed in every request
    identifier: u16,
    /// Sequence number of the next probe
    next_sequence: u16,
    /// Echo payload
    payload: Bytes,
    /// Wire codec
    codec: IcmpCodec,
    /// Raw receive buffer
    recv_buffer: Vec<u8>,
    /// Encode/decode scratch space
    frame: BytesMut,
}

impl<T: IcmpTransport> Pinger<T> {
    /// Creates a pinger with the default payload and buffer size
    pub fn new(transport: T, identifier: u16) -> Self {
        Self::build(
            transport,
            identifier,
            Bytes::from_static(DEFAULT_PAYLOAD),
            DEFAULT_RECV_BUFFER_SIZE,
        )
    }

    /// Creates a pinger from a session configuration
    pub fn with_config(transport: T, config: &PingConfig) -> Self {
        Self::build(
            transport,
            config.identifier(),
            Bytes::from(config.payload.clone()),
            config.recv_buffer_size,
        )
    }

    fn build(transport: T, identifier: u16, payload: Bytes, recv_buffer_size: usize) -> Self {
        Pinger {
            transport,
            identifier,
            next_sequence: 1,
            payload,
            codec: IcmpCodec::new(),
            recv_buffer: vec![0u8; recv_buffer_size],
            frame: BytesMut::with_capacity(recv_buffer_size),
        }
    }

    /// Returns the identifier placed in every request
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Returns the sequence number the next probe will use
    ///
    /// For display only; it says nothing about whether a probe completed.
    pub fn current_sequence(&self) -> u16 {
        self.next_sequence
    }

    /// Returns a reference to the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Performs one request/reply exchange bounded by `timeout`
    ///
    /// The deadline runs from the moment the request is handed to the
    /// transport. Unrelated, malformed or stale datagrams are skipped until a
    /// reply carrying this probe's identifier and sequence arrives.
    pub async fn probe(&mut self, timeout: Duration) -> ProbeOutcome {
        let identity = self.allocate();
        let request = EchoMessage::request(identity, self.payload.clone());

        self.frame.clear();
        if let Err(e) = self.codec.encode(request, &mut self.frame) {
            return ProbeOutcome::Failed(e);
        }

        let start = Instant::now();
        if let Err(e) = self.transport.send(&self.frame).await {
            debug!(%identity, error = %e, "send failed");
            return ProbeOutcome::Failed(Error::Io(e));
        }

        let deadline = start
            .checked_add(timeout)
            .unwrap_or_else(|| start + FAR_FUTURE);
        self.await_reply(identity, start, deadline).await
    }

    fn allocate(&mut self) -> ProbeIdentity {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        ProbeIdentity::new(self.identifier, sequence)
    }

    async fn await_reply(
        &mut self,
        identity: ProbeIdentity,
        start: Instant,
        deadline: Instant,
    ) -> ProbeOutcome {
        loop {
            if Instant::now() >= deadline {
                return ProbeOutcome::TimedOut;
            }

            let read = self.transport.recv(&mut self.recv_buffer);
            let len = match timeout_at(deadline, read).await {
                Err(_elapsed) => return ProbeOutcome::TimedOut,
                Ok(Err(e)) => {
                    debug!(%identity, error = %e, "receive failed");
                    return ProbeOutcome::Failed(Error::Io(e));
                }
                Ok(Ok(len)) => len,
            };
            let received_at = Instant::now();
            // A datagram ready on the same tick as the deadline is too late
            if received_at >= deadline {
                return ProbeOutcome::TimedOut;
            }

            self.frame.clear();
            self.frame.extend_from_slice(&self.recv_buffer[..len]);

            match self.codec.decode(&mut self.frame) {
                Ok(Some(reply)) if reply.kind == EchoKind::Reply => {
                    if reply.identity() == identity {
                        let rtt = received_at.saturating_duration_since(start);
                        return ProbeOutcome::Measured(rtt);
                    }
                    trace!(
                        expected = %identity,
                        got = %reply.identity(),
                        "discarding unrelated echo reply"
                    );
                }
                Ok(Some(other)) => {
                    trace!(kind = ?other.kind, "discarding echo request");
                }
                Ok(None) => {}
                Err(e) => {
                    trace!(error = %e, len, "discarding datagram");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::ScriptedTransport;
    use std::io;

    const ID: u16 = 0x4242;
    const TIMEOUT: Duration = Duration::from_secs(1);

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// The paused clock fires timers on whole-millisecond ticks
    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + ms(1),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_reply_is_measured() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        transport.push_reply(t0 + ms(25), ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        let outcome = pinger.probe(TIMEOUT).await;

        assert_near(outcome.rtt().expect("measured"), ms(25));
        assert_eq!(pinger.current_sequence(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_is_well_formed() {
        let mut pinger = Pinger::new(ScriptedTransport::new(), ID);
        let _ = pinger.probe(ms(10)).await;

        let sent = &pinger.transport().sent[0];
        assert!(crate::protocol::verify_checksum(sent));

        let request = EchoMessage::parse(sent).unwrap();
        assert_eq!(request.kind, EchoKind::Request);
        assert_eq!(request.code, 0);
        assert_eq!(request.identity(), ProbeIdentity::new(ID, 1));
        assert_eq!(&request.payload[..], DEFAULT_PAYLOAD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_noise_is_skipped() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        // Right identifier, wrong sequence
        transport.push_reply(t0 + ms(5), ProbeIdentity::new(ID, 7));
        // Another process's reply
        transport.push_reply(t0 + ms(6), ProbeIdentity::new(ID + 1, 1));
        // Garbage and a truncated header
        transport.push_datagram(t0 + ms(7), vec![0xde, 0xad, 0xbe, 0xef]);
        transport.push_datagram(t0 + ms(8), vec![0x45, 0x00]);
        // Our own request looped back
        let looped = EchoMessage::request(ProbeIdentity::new(ID, 1), &b"RTO-PING"[..]);
        transport.push_datagram(t0 + ms(9), looped.to_bytes().to_vec());
        transport.push_reply(t0 + ms(40), ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        let outcome = pinger.probe(TIMEOUT).await;

        let rtt = outcome.rtt().expect("matching reply after noise");
        assert!(rtt >= ms(40) && rtt < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_behind_ipv4_header() {
        let t0 = Instant::now();
        let reply = EchoMessage::reply_to(&EchoMessage::request(
            ProbeIdentity::new(ID, 1),
            &b"RTO-PING"[..],
        ))
        .to_bytes();

        let mut datagram = vec![0x45, 0, 0, 0, 0, 0, 0, 0, 64, 1, 0, 0, 8, 8, 8, 8, 10, 0, 0, 2];
        datagram.extend_from_slice(&reply);

        let mut transport = ScriptedTransport::new();
        transport.push_datagram(t0 + ms(12), datagram);

        let mut pinger = Pinger::new(transport, ID);
        let rtt = pinger.probe(TIMEOUT).await.rtt().expect("measured");
        assert_near(rtt, ms(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reply_times_out() {
        let mut pinger = Pinger::new(ScriptedTransport::new(), ID);
        let t0 = Instant::now();

        let outcome = pinger.probe(ms(300)).await;

        assert!(outcome.is_timed_out());
        assert_near(Instant::now() - t0, ms(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_is_not_promoted() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        transport.push_reply(t0 + TIMEOUT + ms(1), ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        let outcome = pinger.probe(TIMEOUT).await;

        assert!(outcome.is_timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_at_deadline_times_out() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        transport.push_reply(t0 + TIMEOUT, ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        let outcome = pinger.probe(TIMEOUT).await;

        assert!(outcome.is_timed_out(), "got {}", outcome);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        transport.push_reply(t0 + ms(5), ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        let rtt = pinger.probe(Duration::MAX).await.rtt().expect("measured");
        assert_near(rtt, ms(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_noise_cannot_extend_deadline() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        for i in 1..=9 {
            transport.push_reply(t0 + ms(100 * i), ProbeIdentity::new(ID, 99));
        }
        transport.push_reply(t0 + ms(1100), ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        assert!(pinger.probe(TIMEOUT).await.is_timed_out());
        assert_near(Instant::now() - t0, TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reply_not_matched_by_next_probe() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        // Reply to probe 1 shows up during probe 2
        transport.push_reply(t0 + ms(1500), ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        assert!(pinger.probe(TIMEOUT).await.is_timed_out());
        assert!(pinger.probe(TIMEOUT).await.is_timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure() {
        let mut transport = ScriptedTransport::new();
        transport.fail_sends(&[true]);

        let mut pinger = Pinger::new(transport, ID);
        let outcome = pinger.probe(TIMEOUT).await;

        assert!(matches!(outcome, ProbeOutcome::Failed(Error::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_failure_is_terminal() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        transport.push_error(t0 + ms(3), io::ErrorKind::ConnectionRefused);
        transport.push_reply(t0 + ms(4), ProbeIdentity::new(ID, 1));

        let mut pinger = Pinger::new(transport, ID);
        let outcome = pinger.probe(TIMEOUT).await;

        assert!(outcome.is_failed());
        assert_near(Instant::now() - t0, ms(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_advances_regardless_of_outcome() {
        let t0 = Instant::now();
        let mut transport = ScriptedTransport::new();
        // Probe 1 measured, 2 fails to send, 3 times out, 4 measured
        transport.fail_sends(&[false, true, false, false]);
        transport.push_reply(t0 + ms(10), ProbeIdentity::new(ID, 1));
        transport.push_reply(t0 + ms(1500), ProbeIdentity::new(ID, 4));

        let mut pinger = Pinger::new(transport, ID);
        assert!(pinger.probe(TIMEOUT).await.rtt().is_some());
        assert!(pinger.probe(TIMEOUT).await.is_failed());
        assert!(pinger.probe(TIMEOUT).await.is_timed_out());
        assert!(pinger.probe(TIMEOUT).await.rtt().is_some());

        assert_eq!(pinger.transport().sent_sequences(), vec![1, 2, 3, 4]);
        assert_eq!(pinger.current_sequence(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_wraps() {
        let mut pinger = Pinger::new(ScriptedTransport::new(), ID);
        pinger.next_sequence = u16::MAX;

        let _ = pinger.probe(ms(1)).await;
        let _ = pinger.probe(ms(1)).await;

        assert_eq!(pinger.transport().sent_sequences(), vec![u16::MAX, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_config() {
        let config = PingConfig {
            identifier: Some(0x0bad),
            payload: b"custom".to_vec(),
            ..Default::default()
        };
        let mut pinger = Pinger::with_config(ScriptedTransport::new(), &config);
        assert_eq!(pinger.identifier(), 0x0bad);

        let _ = pinger.probe(ms(1)).await;
        let request = EchoMessage::parse(&pinger.transport().sent[0]).unwrap();
        assert_eq!(&request.payload[..], b"custom");
    }
}
