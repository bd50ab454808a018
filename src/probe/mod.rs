//! Echo exchange module
//!
//! A [`Pinger`] performs one request/reply cycle per call and classifies the
//! result as a [`ProbeOutcome`]. Missing replies are an outcome, not an error.

mod pinger;

pub use self::pinger::Pinger;

use std::fmt;
use std::time::Duration;

use crate::core::Error;

/// Result of a single probe
#[derive(Debug)]
pub enum ProbeOutcome {
    /// A matching echo reply arrived after the given round-trip time
    Measured(Duration),
    /// No matching reply arrived before the deadline
    TimedOut,
    /// The transport failed; carries no latency information
    Failed(Error),
}

impl ProbeOutcome {
    /// Returns the measured round-trip time, if any
    pub fn rtt(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Measured(rtt) => Some(*rtt),
            _ => None,
        }
    }

    /// Whether the probe hit its deadline
    pub fn is_timed_out(&self) -> bool {
        matches!(self, ProbeOutcome::TimedOut)
    }

    /// Whether the probe failed in the transport
    pub fn is_failed(&self) -> bool {
        matches!(self, ProbeOutcome::Failed(_))
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Measured(rtt) => {
                write!(f, "reply, rtt {:?}", crate::util::round_micros(*rtt))
            }
            ProbeOutcome::TimedOut => write!(f, "timeout"),
            ProbeOutcome::Failed(e) => write!(f, "error: {}", e),
        }
    }
}
