//! Core sampling engine for RoomSense
//!
//! Samples two air sensors and two contact switches at fixed cadences,
//! aggregates readings into per-window means, publishes them, and keeps the
//! VOC sensor's baseline calibrated and persisted across restarts.
//!
//! Key constraints:
//! - One thread of control, one tick per second
//! - No failure stops the loop; faults are counted in [`HealthCounters`]
//! - The baseline log is append-only and survives torn writes
//!
//! Hardware and transport live behind the traits in [`traits`]; the agent
//! binary plugs in concrete drivers.
//!
//! ```no_run
//! use roomsense_core::{Devices, MemoryBaselineStore, Scheduler, SchedulerConfig};
//! use roomsense_core::time::{SystemTime, TimeSource};
//! # fn devices() -> Devices { unimplemented!() }
//!
//! let clock = SystemTime;
//! let mut scheduler = Scheduler::new(
//!     SchedulerConfig::new("a152"),
//!     devices(),
//!     MemoryBaselineStore::new(),
//!     clock.now(),
//! )?;
//! scheduler.start();
//!
//! loop {
//!     scheduler.tick(clock.now());
//!     // sleep until scheduler.next_wake()
//! }
//! # Ok::<(), roomsense_core::errors::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod aggregator;
pub mod baseline;
pub mod calibration;
pub mod config;
pub mod contact;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod scheduler;
pub mod time;
pub mod traits;

// Public API
pub use aggregator::Aggregator;
pub use baseline::{time_since_latest, BaselineSnapshot, BaselineStore, MemoryBaselineStore};
#[cfg(feature = "baseline-file")]
pub use baseline::JsonLinesBaselineStore;
pub use calibration::{CalibrationEnvironment, CalibrationManager, CalibrationMode, CalibrationPhase};
pub use config::{Intervals, SchedulerConfig};
pub use contact::{ContactChange, ContactMonitor};
pub use errors::{AgentError, ConfigError, PublishError, SensorError, StoreError};
pub use health::HealthCounters;
pub use metrics::{metric_name, ContactId, MetricKind, MetricSample};
pub use scheduler::{Devices, PublishReport, Scheduler, TickReport};
pub use time::{TimeSource, Timestamp};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
