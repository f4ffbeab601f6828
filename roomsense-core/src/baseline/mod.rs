//! Append-only log of VOC baseline snapshots
//!
//! The VOC sensor's baseline is the only state that outlives the process.
//! It is captured periodically, appended to a log, and the most recent
//! snapshot is restored on the next start so the sensor does not have to
//! relearn its baseline from scratch.
//!
//! ## Semantics
//!
//! - `append` never overwrites prior entries
//! - `latest` returns the snapshot with the greatest `captured_at`
//!   (the last appended one on ties), or `None` on a cold start
//! - `None` is a valid answer, distinct from a read error
//!
//! ## Stores
//!
//! - [`MemoryBaselineStore`] - in-process, for tests and dry runs
//! - [`JsonLinesBaselineStore`] - one JSON object per line on disk
//!   (requires `baseline-file`)

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::time::{elapsed_ms, TimeUnit, Timestamp};
use crate::traits::Baseline;

#[cfg(feature = "baseline-file")]
pub mod file;

#[cfg(feature = "baseline-file")]
pub use file::JsonLinesBaselineStore;

/// One captured baseline pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    /// eCO2 baseline word
    pub eco2_base: u16,
    /// TVOC baseline word
    pub tvoc_base: u16,
    /// Capture time
    pub captured_at: Timestamp,
    /// Captured while the sensor was still calibrating
    pub is_calibrating: bool,
}

impl BaselineSnapshot {
    /// Snapshot of `baseline` taken at `captured_at`
    pub fn new(baseline: Baseline, captured_at: Timestamp, is_calibrating: bool) -> Self {
        Self {
            eco2_base: baseline.eco2,
            tvoc_base: baseline.tvoc,
            captured_at,
            is_calibrating,
        }
    }

    /// The pair to hand back to the sensor
    pub fn baseline(&self) -> Baseline {
        Baseline {
            eco2: self.eco2_base,
            tvoc: self.tvoc_base,
        }
    }
}

/// Persistent, append-only snapshot sequence
pub trait BaselineStore {
    /// Durably append a snapshot
    fn append(&mut self, snapshot: &BaselineSnapshot) -> Result<(), StoreError>;

    /// Most recent snapshot, `None` when the store is empty
    fn latest(&self) -> Result<Option<BaselineSnapshot>, StoreError>;

    /// Capture time of the most recent snapshot
    fn latest_captured_at(&self) -> Result<Option<Timestamp>, StoreError> {
        Ok(self.latest()?.map(|s| s.captured_at))
    }
}

impl<S: BaselineStore + ?Sized> BaselineStore for Box<S> {
    fn append(&mut self, snapshot: &BaselineSnapshot) -> Result<(), StoreError> {
        (**self).append(snapshot)
    }

    fn latest(&self) -> Result<Option<BaselineSnapshot>, StoreError> {
        (**self).latest()
    }

    fn latest_captured_at(&self) -> Result<Option<Timestamp>, StoreError> {
        (**self).latest_captured_at()
    }
}

/// Elapsed time since the latest snapshot, in `unit`
///
/// `Ok(None)` when nothing has been captured yet.
pub fn time_since_latest<S: BaselineStore + ?Sized>(
    store: &S,
    now: Timestamp,
    unit: TimeUnit,
) -> Result<Option<f64>, StoreError> {
    Ok(store
        .latest_captured_at()?
        .map(|at| unit.from_millis(elapsed_ms(at, now))))
}

/// Pick the newest of a sequence in append order
pub(crate) fn newest<I>(snapshots: I) -> Option<BaselineSnapshot>
where
    I: IntoIterator<Item = BaselineSnapshot>,
{
    snapshots.into_iter().fold(None, |best, s| match best {
        Some(b) if b.captured_at > s.captured_at => Some(b),
        _ => Some(s),
    })
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryBaselineStore {
    snapshots: Vec<BaselineSnapshot>,
}

impl MemoryBaselineStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots in append order
    pub fn snapshots(&self) -> &[BaselineSnapshot] {
        &self.snapshots
    }

    /// Number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// No snapshot yet
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn append(&mut self, snapshot: &BaselineSnapshot) -> Result<(), StoreError> {
        self.snapshots.push(*snapshot);
        Ok(())
    }

    fn latest(&self) -> Result<Option<BaselineSnapshot>, StoreError> {
        Ok(newest(self.snapshots.iter().copied()))
    }
}
