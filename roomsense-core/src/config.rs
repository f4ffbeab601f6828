//! Scheduler configuration
//!
//! The operator-facing file format lives in the agent binary; this is the
//! validated form the core runs on.

use core::time::Duration;

use crate::calibration::CalibrationMode;
use crate::errors::ConfigError;

/// Default fast (VOC) sampling interval
pub const DEFAULT_FAST_INTERVAL: Duration = Duration::from_secs(1);
/// Default slow (CO2/climate) sampling interval
pub const DEFAULT_SLOW_INTERVAL: Duration = Duration::from_secs(6);
/// Default publish interval
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_secs(60);
/// Default baseline logging interval
pub const DEFAULT_BASELINE_INTERVAL: Duration = Duration::from_secs(3600);

/// Fixed task intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    /// VOC sampling
    pub fast: Duration,
    /// Climate sampling
    pub slow: Duration,
    /// Aggregation window and publish cadence
    pub publish: Duration,
    /// Baseline snapshot cadence
    pub baseline: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST_INTERVAL,
            slow: DEFAULT_SLOW_INTERVAL,
            publish: DEFAULT_PUBLISH_INTERVAL,
            baseline: DEFAULT_BASELINE_INTERVAL,
        }
    }
}

impl Intervals {
    /// Reject zero intervals and publish windows that could be empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("fast", self.fast),
            ("slow", self.slow),
            ("publish", self.publish),
            ("baseline", self.baseline),
        ];
        for (name, interval) in named {
            if interval.is_zero() {
                return Err(ConfigError::InvalidInterval {
                    name,
                    reason: "must be greater than zero",
                });
            }
        }

        // Every publish window must contain at least one sample of each stream
        if self.publish <= self.slow || self.publish <= self.fast {
            return Err(ConfigError::InvalidInterval {
                name: "publish",
                reason: "must be longer than the fast and slow sampling intervals",
            });
        }

        Ok(())
    }
}

/// Everything the scheduler needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Prefix of every published metric name
    pub location_id: String,
    /// Task intervals
    pub intervals: Intervals,
    /// Whether startup begins a calibration run
    pub calibration: CalibrationMode,
}

impl SchedulerConfig {
    /// Defaults for `location_id`
    pub fn new(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            intervals: Intervals::default(),
            calibration: CalibrationMode::Disabled,
        }
    }

    /// Override the task intervals
    pub fn with_intervals(mut self, intervals: Intervals) -> Self {
        self.intervals = intervals;
        self
    }

    /// Override the calibration mode
    pub fn with_calibration(mut self, calibration: CalibrationMode) -> Self {
        self.calibration = calibration;
        self
    }

    /// Reject an empty location or inconsistent intervals
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.location_id.trim().is_empty() {
            return Err(ConfigError::MissingLocation);
        }
        self.intervals.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SchedulerConfig::new("a152").validate().is_ok());
    }

    #[test]
    fn empty_location_rejected() {
        assert_eq!(
            SchedulerConfig::new("  ").validate(),
            Err(ConfigError::MissingLocation)
        );
    }

    #[test]
    fn publish_must_outlast_feeders() {
        let intervals = Intervals {
            publish: Duration::from_secs(5),
            ..Intervals::default()
        };
        assert!(matches!(
            intervals.validate(),
            Err(ConfigError::InvalidInterval { name: "publish", .. })
        ));

        let intervals = Intervals {
            baseline: Duration::ZERO,
            ..Intervals::default()
        };
        assert!(matches!(
            intervals.validate(),
            Err(ConfigError::InvalidInterval { name: "baseline", .. })
        ));
    }
}
