//! Timing and estimation module
//!
//! This module turns probe outcomes into timing state:
//!
//! - [`RtoEstimator`]: RFC 6298 smoothed RTT, RTT variation and the
//!   retransmission timeout derived from them, with exponential backoff
//! - [`ProbeStats`]: per-run counters and RTT summary
//!
//! # Examples
//!
//! ```
//! use rto_ping::time::RtoEstimator;
//! use std::time::Duration;
//!
//! let mut estimator = RtoEstimator::new();
//! estimator.on_success(Duration::from_millis(400));
//! assert_eq!(estimator.rto(), Duration::from_millis(1200));
//!
//! estimator.on_timeout();
//! assert_eq!(estimator.rto(), Duration::from_millis(2400));
//! ```

pub mod rto;
mod stats;

pub use self::rto::{constants as rto_constants, RtoEstimator};
pub use self::stats::{ProbeStats, RttStats};
