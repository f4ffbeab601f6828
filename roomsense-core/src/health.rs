//! Health counters
//!
//! Steady-state faults never stop the loop, so they are counted instead.
//! The agent reports these after each publish cycle; baseline persist
//! failures are the one counter an operator must look at, since a lost
//! snapshot can mean a miscalibrated cold start.

use core::fmt;

use serde::Serialize;

/// Cumulative fault and activity counters since process start
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthCounters {
    /// Fast or slow sensor reads that failed
    pub sensor_read_failures: u64,
    /// Contact line reads that failed
    pub contact_read_failures: u64,
    /// Humidity compensation writes the VOC sensor rejected
    pub compensation_failures: u64,
    /// Metric publishes that failed
    pub publish_failures: u64,
    /// Metric publishes that succeeded
    pub publishes_sent: u64,
    /// Baseline snapshots that could not be captured or persisted
    pub baseline_persist_failures: u64,
    /// Metrics skipped at publish time because their window was empty
    pub empty_windows: u64,
    /// Completed publish cycles (including the warm-up cycle)
    pub publish_cycles: u64,
}

impl HealthCounters {
    /// Any failure recorded at all
    pub fn has_failures(&self) -> bool {
        self.sensor_read_failures
            + self.contact_read_failures
            + self.compensation_failures
            + self.publish_failures
            + self.baseline_persist_failures
            + self.empty_windows
            > 0
    }
}

impl fmt::Display for HealthCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} sent={} publish_failed={} sensor_failed={} contact_failed={} \
             compensation_failed={} baseline_lost={} empty_windows={}",
            self.publish_cycles,
            self.publishes_sent,
            self.publish_failures,
            self.sensor_read_failures,
            self.contact_read_failures,
            self.compensation_failures,
            self.baseline_persist_failures,
            self.empty_windows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_counters_have_no_failures() {
        let mut health = HealthCounters::default();
        health.publishes_sent = 10;
        health.publish_cycles = 2;
        assert!(!health.has_failures());

        health.baseline_persist_failures = 1;
        assert!(health.has_failures());
        assert!(health.to_string().contains("baseline_lost=1"));
    }
}
