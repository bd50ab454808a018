//! rto-ping: ICMP echo latency prober with an adaptive timeout
//!
//! This library measures round-trip latency with ICMPv4 echo probes and sizes
//! each probe's timeout with the RFC 6298 retransmission-timeout estimator.
//! A missing reply is a normal outcome that backs the timeout off; it is
//! never confused with a transport failure.
//!
//! ```no_run
//! use rto_ping::core::PingConfig;
//! use rto_ping::network::{resolve_target, RawIcmpSocket};
//! use rto_ping::probe::Pinger;
//! use rto_ping::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> rto_ping::Result<()> {
//!     let config = PingConfig::for_target("8.8.8.8");
//!     let destination = resolve_target(&config.target).await?;
//!     let pinger = Pinger::with_config(RawIcmpSocket::open(destination)?, &config);
//!
//!     let mut session = Session::new(pinger, config);
//!     let stats = session.run(|report| println!("{}", report)).await;
//!     println!("{}", stats);
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod network;
pub mod probe;
pub mod protocol;
pub mod session;
pub mod time;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Error, PingConfig, ProbeIdentity, Result};
pub use crate::probe::{Pinger, ProbeOutcome};
pub use crate::time::RtoEstimator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
