use std::fmt;
use std::time::Duration;

/// Round-trip time statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttStats {
    /// Minimum RTT
    pub min: Duration,
    /// Maximum RTT
    pub max: Duration,
    /// Mean RTT
    pub mean: Duration,
    /// Standard deviation of RTT
    pub stddev: Duration,
}

/// Per-run probe counters
#[derive(Debug, Clone, Default)]
pub struct ProbeStats {
    /// Probes handed to the transport (or attempted)
    pub transmitted: u32,
    /// Probes answered by a matching reply
    pub received: u32,
    /// Probes that hit their deadline
    pub timed_out: u32,
    /// Probes that failed in the transport
    pub failed: u32,
    min: Option<Duration>,
    max: Option<Duration>,
    /// Sum of RTTs in seconds
    sum: f64,
    /// Sum of squared RTTs in seconds squared
    sum_squares: f64,
}

impl ProbeStats {
    /// Creates empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a probe answered after `rtt`
    pub fn record_measured(&mut self, rtt: Duration) {
        self.transmitted += 1;
        self.received += 1;
        self.min = Some(self.min.map_or(rtt, |min| min.min(rtt)));
        self.max = Some(self.max.map_or(rtt, |max| max.max(rtt)));

        let secs = rtt.as_secs_f64();
        self.sum += secs;
        self.sum_squares += secs * secs;
    }

    /// Records a probe that timed out
    pub fn record_timeout(&mut self) {
        self.transmitted += 1;
        self.timed_out += 1;
    }

    /// Records a probe that failed in the transport
    pub fn record_failure(&mut self) {
        self.transmitted += 1;
        self.failed += 1;
    }

    /// Percentage of probes without a matching reply
    pub fn loss_percent(&self) -> f64 {
        if self.transmitted == 0 {
            return 0.0;
        }
        (self.transmitted - self.received) as f64 / self.transmitted as f64 * 100.0
    }

    /// RTT statistics over measured probes, if any
    pub fn rtt(&self) -> Option<RttStats> {
        let (min, max) = (self.min?, self.max?);
        let n = self.received as f64;
        let mean = self.sum / n;
        let variance = (self.sum_squares / n - mean * mean).max(0.0);

        Some(RttStats {
            min,
            max,
            mean: Duration::from_secs_f64(mean),
            stddev: Duration::from_secs_f64(variance.sqrt()),
        })
    }
}

impl fmt::Display for ProbeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} probes transmitted, {} received, {} timed out, {} failed, {:.1}% loss",
            self.transmitted,
            self.received,
            self.timed_out,
            self.failed,
            self.loss_percent()
        )?;

        if let Some(rtt) = self.rtt() {
            write!(
                f,
                "\nrtt min/avg/max/stddev = {:?}/{:?}/{:?}/{:?}",
                crate::util::round_micros(rtt.min),
                crate::util::round_micros(rtt.mean),
                crate::util::round_micros(rtt.max),
                crate::util::round_micros(rtt.stddev),
            )?;
        }

        Ok(())
    }
}
