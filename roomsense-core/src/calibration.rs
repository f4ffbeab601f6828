//! VOC baseline calibration lifecycle
//!
//! ## Phases
//!
//! ```text
//!   start ──(calibration enabled)──▶ Calibrating(deadline) ──now >= deadline──▶ Normal
//!     │                                                                          ▲
//!     └──────────────(calibration disabled, restore latest snapshot)─────────────┘
//! ```
//!
//! A fresh sensor needs a long burn-in in representative air before its
//! baseline means anything: about 12 hours indoors, or a short stint in
//! clean outdoor air. While calibrating, no persisted baseline is applied.
//! Once the deadline passes the manager captures the sensor baseline, writes
//! it as a *calibrated* snapshot and switches to `Normal` for the rest of the
//! process lifetime.
//!
//! When calibration is disabled the manager starts in `Normal` and seeds the
//! sensor from the most recent persisted snapshot before any measurement.
//!
//! ## Ownership
//!
//! The manager is the only writer of baseline snapshots. It owns the store.

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::baseline::{BaselineSnapshot, BaselineStore};
use crate::errors::{AgentError, ConfigError, StoreError};
use crate::time::{offset, to_rfc3339, Timestamp};
use crate::traits::{Baseline, VocSensor};

/// Burn-in for an indoor calibration
pub const INDOOR_CALIBRATION: Duration = Duration::from_secs(12 * 60 * 60);

/// Burn-in for an outdoor calibration (10 minutes suffices, 12 for margin)
pub const OUTDOOR_CALIBRATION: Duration = Duration::from_secs(12 * 60);

/// Where the calibration burn-in happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationEnvironment {
    /// Room air, long run
    #[serde(alias = "in")]
    Indoor,
    /// Fresh air, short run
    #[serde(alias = "out")]
    Outdoor,
}

impl CalibrationEnvironment {
    /// How long calibration lasts
    pub const fn duration(self) -> Duration {
        match self {
            Self::Indoor => INDOOR_CALIBRATION,
            Self::Outdoor => OUTDOOR_CALIBRATION,
        }
    }
}

impl FromStr for CalibrationEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indoor" | "in" => Ok(Self::Indoor),
            "outdoor" | "out" => Ok(Self::Outdoor),
            other => Err(ConfigError::InvalidCalibrationEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for CalibrationEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indoor => f.write_str("indoor"),
            Self::Outdoor => f.write_str("outdoor"),
        }
    }
}

/// Startup calibration choice, already validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationMode {
    /// Restore the latest persisted baseline
    Disabled,
    /// Burn in for the environment's duration
    Enabled(CalibrationEnvironment),
}

/// Current calibration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Calibrating until `deadline`
    Calibrating {
        /// When calibration ends
        deadline: Timestamp,
    },
    /// Baseline is trusted
    Normal,
}

impl CalibrationPhase {
    /// Still before the deadline
    pub fn is_calibrating(self) -> bool {
        matches!(self, Self::Calibrating { .. })
    }
}

/// Outcome of the one-time `Calibrating -> Normal` transition
#[derive(Debug)]
pub struct CalibrationCompleted {
    /// Tick that crossed the deadline
    pub at: Timestamp,
    /// The calibrated snapshot, or why it was not persisted
    pub persisted: Result<BaselineSnapshot, AgentError>,
}

/// Owns the calibration phase and the baseline log
pub struct CalibrationManager<S> {
    phase: CalibrationPhase,
    store: S,
}

impl<S: BaselineStore> CalibrationManager<S> {
    /// Manager for `mode`, started at `start`
    pub fn new(store: S, mode: CalibrationMode, start: Timestamp) -> Self {
        let phase = match mode {
            CalibrationMode::Disabled => CalibrationPhase::Normal,
            CalibrationMode::Enabled(env) => CalibrationPhase::Calibrating {
                deadline: offset(start, env.duration()),
            },
        };

        if let CalibrationPhase::Calibrating { deadline } = phase {
            log::info!("calibrating until {}", to_rfc3339(deadline));
        }

        Self { phase, store }
    }

    /// Current phase
    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Underlying snapshot store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seed the sensor from the most recent persisted snapshot
    ///
    /// Only applies in `Normal`; while calibrating the sensor must learn its
    /// own baseline. `Ok(None)` on a cold start with an empty log.
    pub fn restore<V: VocSensor + ?Sized>(
        &self,
        sensor: &mut V,
    ) -> Result<Option<BaselineSnapshot>, AgentError> {
        if self.phase.is_calibrating() {
            log::debug!("calibrating, not restoring a persisted baseline");
            return Ok(None);
        }

        match self.store.latest()? {
            Some(snapshot) => {
                sensor.set_baseline(snapshot.baseline())?;
                log::info!(
                    "restored baseline eco2={} tvoc={} captured {}",
                    snapshot.eco2_base,
                    snapshot.tvoc_base,
                    to_rfc3339(snapshot.captured_at)
                );
                Ok(Some(snapshot))
            }
            None => {
                log::warn!("no persisted baseline, sensor starts uncalibrated");
                Ok(None)
            }
        }
    }

    /// Persist a periodic snapshot tagged with the current phase
    pub fn on_baseline_interval_elapsed(
        &mut self,
        baseline: Baseline,
        now: Timestamp,
    ) -> Result<BaselineSnapshot, StoreError> {
        let snapshot = BaselineSnapshot::new(baseline, now, self.phase.is_calibrating());
        self.store.append(&snapshot)?;
        log::info!(
            "wrote baseline eco2={} tvoc={} calibrating={}",
            snapshot.eco2_base,
            snapshot.tvoc_base,
            snapshot.is_calibrating
        );
        Ok(snapshot)
    }

    /// Whether calibrating and the deadline has been reached
    pub fn deadline_reached(&self, now: Timestamp) -> bool {
        match self.phase {
            CalibrationPhase::Calibrating { deadline } => now >= deadline,
            CalibrationPhase::Normal => false,
        }
    }

    /// Finish calibration once the deadline is reached
    ///
    /// Captures the sensor baseline, persists it as calibrated and moves to
    /// `Normal`. The transition happens even if capture or persist fails.
    /// Returns `None` on every tick that does not cross the deadline,
    /// including all ticks after the transition.
    pub fn on_tick<V: VocSensor + ?Sized>(
        &mut self,
        now: Timestamp,
        sensor: &mut V,
    ) -> Option<CalibrationCompleted> {
        if !self.deadline_reached(now) {
            return None;
        }

        self.phase = CalibrationPhase::Normal;

        let persisted = sensor
            .baseline()
            .map_err(AgentError::from)
            .and_then(|baseline| {
                let snapshot = BaselineSnapshot::new(baseline, now, false);
                self.store.append(&snapshot)?;
                Ok(snapshot)
            });

        match &persisted {
            Ok(s) => log::info!(
                "calibration finished, baseline eco2={} tvoc={}",
                s.eco2_base,
                s.tvoc_base
            ),
            Err(e) => log::warn!("calibration finished but baseline was not persisted: {}", e),
        }

        Some(CalibrationCompleted { at: now, persisted })
    }
}
