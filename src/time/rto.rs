//! RFC 6298 retransmission timeout estimation.

use std::time::Duration;

use tracing::trace;

/// Estimator constants from RFC 6298.
pub mod constants {
    use std::time::Duration;

    /// Lower bound of the timeout, also its value before the first sample.
    pub const MIN_RTO: Duration = Duration::from_secs(1);

    /// Upper bound of the timeout.
    pub const MAX_RTO: Duration = Duration::from_secs(60);

    /// Reciprocal of alpha, the SRTT gain (alpha = 1/8).
    pub const ALPHA_RECIPROCAL: u32 = 8;

    /// Reciprocal of beta, the RTTVAR gain (beta = 1/4).
    pub const BETA_RECIPROCAL: u32 = 4;

    /// Variance multiplier in RTO = SRTT + K * RTTVAR.
    pub const K: u32 = 4;
}

use self::constants::{ALPHA_RECIPROCAL, BETA_RECIPROCAL, K, MAX_RTO, MIN_RTO};

/// Smoothed RTT filter with exponential backoff.
///
/// The gains are exact fractions, so the filter runs on `Duration` with
/// integer nanosecond arithmetic instead of floating point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtoEstimator {
    /// Smoothed round-trip time.
    srtt: Duration,
    /// Round-trip time variation.
    rttvar: Duration,
    /// Current retransmission timeout.
    rto: Duration,
    /// Whether at least one RTT sample has been observed.
    has_sample: bool,
}

impl Default for RtoEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RtoEstimator {
    /// Creates an estimator with RTO = `MIN_RTO` and no samples.
    pub fn new() -> Self {
        Self {
            srtt: Duration::ZERO,
            rttvar: Duration::ZERO,
            rto: MIN_RTO,
            has_sample: false,
        }
    }

    /// Records a measured round trip.
    ///
    /// - First sample: SRTT = R, RTTVAR = R / 2
    /// - Later: RTTVAR = 3/4 RTTVAR + 1/4 |SRTT - R|, then SRTT = 7/8 SRTT + 1/8 R
    ///
    /// RTTVAR must be updated from the SRTT that predates this sample.
    pub fn on_success(&mut self, rtt: Duration) {
        if !self.has_sample {
            self.srtt = rtt;
            self.rttvar = rtt / 2;
            self.has_sample = true;
        } else {
            let deviation = if self.srtt > rtt {
                self.srtt - rtt
            } else {
                rtt - self.srtt
            };
            self.rttvar = self
                .rttvar
                .saturating_mul(BETA_RECIPROCAL - 1)
                .saturating_add(deviation)
                / BETA_RECIPROCAL;
            self.srtt = self
                .srtt
                .saturating_mul(ALPHA_RECIPROCAL - 1)
                .saturating_add(rtt)
                / ALPHA_RECIPROCAL;
        }

        self.rto = clamp(self.srtt.saturating_add(self.rttvar.saturating_mul(K)));

        trace!(
            sample = ?rtt,
            srtt = ?self.srtt,
            rttvar = ?self.rttvar,
            rto = ?self.rto,
            "rto: sample"
        );
    }

    /// Records that no reply arrived and doubles the timeout.
    ///
    /// SRTT and RTTVAR are left alone (Karn's algorithm).
    pub fn on_timeout(&mut self) {
        self.rto = clamp(self.rto.saturating_mul(2));
        trace!(rto = ?self.rto, "rto: backoff");
    }

    /// Timeout to use for the next probe.
    pub fn rto(&self) -> Duration {
        self.rto
    }

    /// Smoothed RTT, once a sample exists.
    pub fn srtt(&self) -> Option<Duration> {
        self.has_sample.then_some(self.srtt)
    }

    /// RTT variation, once a sample exists.
    pub fn rttvar(&self) -> Option<Duration> {
        self.has_sample.then_some(self.rttvar)
    }

    /// Whether at least one RTT sample has been observed.
    pub fn has_sample(&self) -> bool {
        self.has_sample
    }
}

fn clamp(rto: Duration) -> Duration {
    rto.clamp(MIN_RTO, MAX_RTO)
}
