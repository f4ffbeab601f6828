//! Error Types for the Telemetry Agent
//!
//! ## Design Philosophy
//!
//! RoomSense runs unattended for months. Nothing that goes wrong in steady
//! state is allowed to stop the sampling loop, so the error types here are
//! split by *who recovers*:
//!
//! 1. **Local recovery**: `SensorError` and `PublishError` are handled inside
//!    the scheduler tick. The reading or publish is skipped, a health counter
//!    is bumped, and the next tick proceeds normally.
//!
//! 2. **Notable but recoverable**: `StoreError` means a baseline snapshot was
//!    lost. Calibration still advances, but the failure is counted and
//!    reported because a missing snapshot risks a miscalibrated cold start.
//!
//! 3. **Fatal at startup**: `ConfigError` is only produced before the loop
//!    starts. The binary exits with a nonzero status.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use roomsense_core::errors::{AgentError, SensorError};
//!
//! fn classify(err: &AgentError) -> &'static str {
//!     match err {
//!         AgentError::Sensor(SensorError::NotReady { .. }) => "retry next tick",
//!         AgentError::Sensor(_) | AgentError::Publish(_) => "skip and count",
//!         AgentError::Store(_) => "count and report",
//!         AgentError::Config(_) => "exit",
//!     }
//! }
//! ```

use thiserror::Error;

/// Failure reading a sensor or contact line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Bus or line I/O failed
    #[error("{device}: I/O failure: {reason}")]
    Io {
        /// Device that failed (e.g. "sgp30", "scd4x", "door")
        device: &'static str,
        /// Driver-provided detail
        reason: String,
    },

    /// Device has no fresh measurement yet
    #[error("{device}: measurement not ready")]
    NotReady {
        /// Device that was polled
        device: &'static str,
    },

    /// Device answered with data that failed its own integrity checks
    #[error("{device}: invalid data: {reason}")]
    InvalidData {
        /// Device that answered
        device: &'static str,
        /// What was wrong with the frame
        reason: &'static str,
    },
}

impl SensorError {
    /// Convenience constructor for I/O failures
    pub fn io(device: &'static str, reason: impl Into<String>) -> Self {
        Self::Io {
            device,
            reason: reason.into(),
        }
    }
}

/// Failure handing a metric to the telemetry transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    /// Transport is not connected
    #[error("not connected")]
    NotConnected,

    /// Transport refused the message (queue full, rejected, ...)
    #[error("transport rejected {metric}: {reason}")]
    Rejected {
        /// Fully composed metric name
        metric: String,
        /// Transport-provided detail
        reason: String,
    },

    /// Value could not be encoded for the wire
    #[error("cannot encode {metric}: {reason}")]
    Encoding {
        /// Fully composed metric name
        metric: String,
        /// Encoder detail
        reason: String,
    },
}

/// Failure reading or writing the baseline log
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying file I/O failed
    #[error("baseline store I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded
    #[error("baseline record encoding: {0}")]
    Encoding(String),
}

/// Invalid operator configuration, fatal at startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Calibration environment is not one of the supported presets
    #[error("invalid calibration environment {0:?}, expected \"indoor\" or \"outdoor\"")]
    InvalidCalibrationEnvironment(String),

    /// Calibration requested without choosing an environment preset
    #[error("calibration is enabled but no environment was selected")]
    MissingCalibrationEnvironment,

    /// Location identifier is empty
    #[error("location identifier must not be empty")]
    MissingLocation,

    /// Credentials for the publish boundary are missing
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    /// An interval is zero or inconsistent with the others
    #[error("invalid interval {name}: {reason}")]
    InvalidInterval {
        /// Interval name as it appears in the configuration
        name: &'static str,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Free-form error from the configuration source (file, parser)
    #[error("configuration: {0}")]
    Source(String),
}

/// Umbrella error for operations that cross component boundaries
#[derive(Error, Debug)]
pub enum AgentError {
    /// Sensor or contact read failed
    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// Publish failed
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Baseline store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
}
