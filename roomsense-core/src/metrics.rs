//! Metric identities and samples
//!
//! Five aggregated streams come out of the two air sensors:
//!
//! | Metric | Source | Cadence | Wire name |
//! |--------|--------|---------|-----------|
//! | CO2 | SCD4x-class NDIR sensor | slow (6 s) | `co2` |
//! | Temperature | SCD4x-class sensor | slow | `temperature` |
//! | Relative humidity | SCD4x-class sensor | slow | `rh` |
//! | eCO2 | SGP30-class VOC sensor | fast (1 s) | `eco2` |
//! | TVOC | SGP30-class VOC sensor | fast | `tvoc` |
//!
//! Contact switches are not aggregated; they publish on every edge under
//! `door` and `window`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Aggregated metric streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// CO2 in ppm from the slow sensor
    Co2,
    /// Temperature in °C
    Temperature,
    /// Relative humidity in %
    RelativeHumidity,
    /// Equivalent CO2 in ppm from the VOC sensor
    Eco2,
    /// Total VOC in ppb
    Tvoc,
}

impl MetricKind {
    /// Every aggregated metric, in publish order
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Co2,
        MetricKind::Temperature,
        MetricKind::RelativeHumidity,
        MetricKind::Eco2,
        MetricKind::Tvoc,
    ];

    /// Suffix used on the telemetry platform
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Co2 => "co2",
            Self::Temperature => "temperature",
            Self::RelativeHumidity => "rh",
            Self::Eco2 => "eco2",
            Self::Tvoc => "tvoc",
        }
    }

    /// Dense index, stable across releases
    pub const fn index(self) -> usize {
        match self {
            Self::Co2 => 0,
            Self::Temperature => 1,
            Self::RelativeHumidity => 2,
            Self::Eco2 => 3,
            Self::Tvoc => 4,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A single reading, immutable once produced
///
/// Sensor readings are split into samples before they reach the
/// [`Aggregator`](crate::aggregator::Aggregator).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Stream the value belongs to
    pub kind: MetricKind,
    /// Reading in the metric's unit
    pub value: f64,
    /// When the reading was taken
    pub observed_at: Timestamp,
}

impl MetricSample {
    /// Create a sample
    pub fn new(kind: MetricKind, value: f64, observed_at: Timestamp) -> Self {
        Self {
            kind,
            value,
            observed_at,
        }
    }
}

/// Binary contact switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactId {
    /// Door switch
    Door,
    /// Window switch
    Window,
}

impl ContactId {
    /// Both contacts, in check order
    pub const ALL: [ContactId; 2] = [ContactId::Door, ContactId::Window];

    /// Name used in metric names
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Door => "door",
            Self::Window => "window",
        }
    }

    /// Slot in per-contact arrays
    pub const fn index(self) -> usize {
        match self {
            Self::Door => 0,
            Self::Window => 1,
        }
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Compose the platform metric name `"{location}-{metric}"`
pub fn metric_name(location: &str, metric: &str) -> String {
    format!("{}-{}", location, metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense() {
        for (i, kind) in MetricKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        for (i, contact) in ContactId::ALL.iter().enumerate() {
            assert_eq!(contact.index(), i);
        }
    }

    #[test]
    fn names_compose_with_location() {
        assert_eq!(metric_name("a152", MetricKind::RelativeHumidity.wire_name()), "a152-rh");
        assert_eq!(metric_name("a152", ContactId::Window.wire_name()), "a152-window");
    }
}
