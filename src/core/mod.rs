//! Core types for rto-ping
//!
//! This module contains the error type, configuration and the identity
//! shared by every layer of the prober.

pub mod error;
pub mod types;
pub mod serde;

use std::time::Duration;

pub use self::error::{Error, Result};
pub use self::types::{process_identifier, PingConfig, ProbeIdentity};

/// Default probe target (a well-known public resolver)
pub const DEFAULT_TARGET: &str = "8.8.8.8";

/// Default number of probes per run
pub const DEFAULT_COUNT: u32 = 10;

/// Default spacing between probes
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default echo payload
pub const DEFAULT_PAYLOAD: &[u8] = b"RTO-PING";

/// Default receive buffer size (one Ethernet MTU)
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1500;

/// ICMP echo header size in bytes
pub const ICMP_HEADER_SIZE: usize = 8;

/// Largest IPv4 header (IHL = 15)
pub const MAX_IPV4_HEADER_SIZE: usize = 60;

/// Largest echo payload that fits in one IPv4 datagram
pub const MAX_PAYLOAD_SIZE: usize = 65507 - ICMP_HEADER_SIZE;
