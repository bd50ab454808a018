//! Probe session module
//!
//! A [`Session`] drives a [`Pinger`] with the timeout suggested by an
//! [`RtoEstimator`] and feeds each outcome back: replies update the smoothed
//! estimate, timeouts back off, transport failures leave it untouched.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::PingConfig;
use crate::network::IcmpTransport;
use crate::probe::{Pinger, ProbeOutcome};
use crate::time::{ProbeStats, RtoEstimator};
use crate::util::round_micros;

/// What happened during one iteration, with the estimator state afterwards
#[derive(Debug)]
pub struct ProbeReport {
    /// Sequence number carried by the request
    pub sequence: u16,
    /// Timeout the probe ran with
    pub timeout: Duration,
    /// Probe outcome
    pub outcome: ProbeOutcome,
    /// Smoothed RTT after the update
    pub srtt: Option<Duration>,
    /// RTT variation after the update
    pub rttvar: Option<Duration>,
    /// Timeout for the next probe
    pub rto: Duration,
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[seq {}] timeout {:?} -> {}",
            self.sequence, self.timeout, self.outcome
        )?;

        match (&self.outcome, self.srtt, self.rttvar) {
            (ProbeOutcome::Measured(_), Some(srtt), Some(rttvar)) => write!(
                f,
                "\n    srtt {:?}, rttvar {:?}, next rto {:?}",
                round_micros(srtt),
                round_micros(rttvar),
                round_micros(self.rto)
            ),
            (ProbeOutcome::TimedOut, _, _) => {
                write!(f, "\n    backing off, next rto {:?}", self.rto)
            }
            _ => write!(f, "\n    estimator unchanged, next rto {:?}", self.rto),
        }
    }
}

/// Sequential probe loop with RTO feedback
#[derive(Debug)]
pub struct Session<T> {
    pinger: Pinger<T>,
    estimator: RtoEstimator,
    stats: ProbeStats,
    config: PingConfig,
}

impl<T: IcmpTransport> Session<T> {
    /// Creates a session around a ready pinger
    pub fn new(pinger: Pinger<T>, config: PingConfig) -> Self {
        Session {
            pinger,
            estimator: RtoEstimator::new(),
            stats: ProbeStats::new(),
            config,
        }
    }

    /// Runs one probe and feeds its outcome to the estimator
    pub async fn run_once(&mut self) -> ProbeReport {
        let sequence = self.pinger.current_sequence();
        let timeout = self.estimator.rto();

        let outcome = self.pinger.probe(timeout).await;

        match &outcome {
            ProbeOutcome::Measured(rtt) => {
                self.estimator.on_success(*rtt);
                self.stats.record_measured(*rtt);
            }
            ProbeOutcome::TimedOut => {
                self.estimator.on_timeout();
                self.stats.record_timeout();
            }
            ProbeOutcome::Failed(e) => {
                warn!(sequence, error = %e, "probe failed");
                self.stats.record_failure();
            }
        }

        ProbeReport {
            sequence,
            timeout,
            outcome,
            srtt: self.estimator.srtt(),
            rttvar: self.estimator.rttvar(),
            rto: self.estimator.rto(),
        }
    }

    /// Runs `count` probes spaced by the configured interval
    ///
    /// The interval is slept in full after every probe but the last, however
    /// long the probe itself took.
    pub async fn run<F>(&mut self, mut on_report: F) -> ProbeStats
    where
        F: FnMut(&ProbeReport),
    {
        info!(
            host = %self.config.target,
            count = self.config.count,
            interval = ?self.config.interval,
            identifier = self.pinger.identifier(),
            "starting probe session"
        );

        for i in 0..self.config.count {
            let report = self.run_once().await;
            on_report(&report);

            if i + 1 < self.config.count {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        self.stats.clone()
    }

    /// Returns the estimator
    pub fn estimator(&self) -> &RtoEstimator {
        &self.estimator
    }

    /// Returns statistics so far
    pub fn stats(&self) -> &ProbeStats {
        &self.stats
    }

    /// Returns the pinger
    pub fn pinger(&self) -> &Pinger<T> {
        &self.pinger
    }
}
