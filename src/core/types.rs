use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// The (identifier, sequence) pair that tags one in-flight echo request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeIdentity {
    /// Identifier shared by every request from one pinger
    pub identifier: u16,
    /// Per-request sequence number
    pub sequence: u16,
}

impl ProbeIdentity {
    /// Creates a new probe identity
    pub fn new(identifier: u16, sequence: u16) -> Self {
        ProbeIdentity { identifier, sequence }
    }
}

impl fmt::Display for ProbeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={:#06x} seq={}", self.identifier, self.sequence)
    }
}

/// Returns the identifier derived from the current process id
///
/// Concurrent pingers on one host see each other's replies on their raw
/// sockets, so the low 16 bits of the pid keep them apart.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Configuration for a ping session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    /// Host name or IPv4 address to probe
    pub target: String,
    /// Number of probes to send
    pub count: u32,
    /// Fixed spacing between probes
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub interval: Duration,
    /// Echo payload carried by every request
    pub payload: Vec<u8>,
    /// Echo identifier; derived from the pid when unset
    pub identifier: Option<u16>,
    /// Size of the datagram receive buffer
    pub recv_buffer_size: usize,
}

impl PingConfig {
    /// Creates a configuration for the given target with default settings
    pub fn for_target(target: impl Into<String>) -> Self {
        PingConfig {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Returns the configured identifier, or the process-derived one
    pub fn identifier(&self) -> u16 {
        self.identifier.unwrap_or_else(process_identifier)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(Error::config("Target must not be empty"));
        }

        if self.payload.is_empty() {
            return Err(Error::config("Echo payload must not be empty"));
        }

        if self.payload.len() > super::MAX_PAYLOAD_SIZE {
            return Err(Error::config(format!(
                "Echo payload of {} bytes exceeds {} bytes",
                self.payload.len(),
                super::MAX_PAYLOAD_SIZE
            )));
        }

        // Room for the largest IPv4 header in front of our echo reply
        let min_buffer = super::MAX_IPV4_HEADER_SIZE + super::ICMP_HEADER_SIZE + self.payload.len();
        if self.recv_buffer_size < min_buffer {
            return Err(Error::config(format!(
                "Receive buffer of {} bytes cannot hold a {} byte reply",
                self.recv_buffer_size, min_buffer
            )));
        }

        Ok(())
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        PingConfig {
            target: super::DEFAULT_TARGET.to_string(),
            count: super::DEFAULT_COUNT,
            interval: super::DEFAULT_INTERVAL,
            payload: super::DEFAULT_PAYLOAD.to_vec(),
            identifier: None,
            recv_buffer_size: super::DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}
