//! Time management for the agent
//!
//! Provides clock abstraction so the scheduler never reads the wall clock
//! itself:
//! - System clock for the running agent
//! - Fixed, manually advanced clock for tests
//!
//! All scheduling is in whole seconds to minutes, so millisecond timestamps
//! are plenty and sub-second jitter is expected and ignored.

use core::cell::Cell;
use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Milliseconds per second
pub const MS_PER_SECOND: u64 = 1_000;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Fixed time source for testing
///
/// Advances through a shared reference so a test can move time forward from
/// a sleep callback while the loop under test holds the clock.
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: Cell<Timestamp>,
}

impl FixedTime {
    /// Clock reading `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: Cell::new(timestamp),
        }
    }

    /// Jump to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.set(self.timestamp.get().saturating_add(ms));
    }

    /// Move forward by whole seconds
    pub fn advance_secs(&self, secs: u64) {
        self.advance(secs * MS_PER_SECOND);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}

/// Add a duration to a timestamp, saturating at the far future
pub fn offset(ts: Timestamp, by: Duration) -> Timestamp {
    ts.saturating_add(by.as_millis() as u64)
}

/// Milliseconds elapsed from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// RFC 3339 rendering of a timestamp, for logs and human-readable records
pub fn to_rfc3339(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts as i64)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| format!("@{}ms", ts))
}

/// Unit used when reporting elapsed time to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// `s`
    Seconds,
    /// `m`
    Minutes,
    /// `h`
    Hours,
    /// `d`
    Days,
}

impl TimeUnit {
    /// Convert a millisecond span into this unit
    pub fn from_millis(self, ms: u64) -> f64 {
        let secs = ms as f64 / MS_PER_SECOND as f64;
        match self {
            Self::Seconds => secs,
            Self::Minutes => secs / 60.0,
            Self::Hours => secs / 3_600.0,
            Self::Days => secs / 86_400.0,
        }
    }

    /// Short suffix ("s", "m", "h", "d")
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "mins" | "minutes" => Ok(Self::Minutes),
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            other => Err(format!("unknown time unit {:?} (use s, m, h or d)", other)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
