//! Running-mean aggregation of high-rate samples
//!
//! Every metric stream owns one [`AggregateBucket`]: a running sum and a
//! sample count. Recording is O(1) and cannot fail. Draining a bucket yields
//! the arithmetic mean of exactly the values recorded since the last drain
//! or reset, then zeroes it.
//!
//! ## Empty buckets
//!
//! A mean over zero samples is undefined and is never computed.
//! [`Aggregator::drain_mean`] returns `None` instead, and the caller decides
//! what an empty window means. For the scheduler it is a logic error: the
//! publish interval is shorter than a feeder interval.

use crate::metrics::{MetricKind, MetricSample};

/// Sum and count for one metric
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateBucket {
    sum: f64,
    count: u32,
}

impl AggregateBucket {
    /// Add one value
    pub fn record(&mut self, value: f64) {
        self.sum += value;
        self.count = self.count.saturating_add(1);
    }

    /// Mean of the recorded values, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / f64::from(self.count))
        }
    }

    /// Samples recorded
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Sum of recorded values
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Nothing recorded since the last reset
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Zero sum and count
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One bucket per aggregated metric
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    buckets: [AggregateBucket; MetricKind::ALL.len()],
}

impl Aggregator {
    /// All buckets empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample to its metric's bucket
    pub fn record(&mut self, sample: MetricSample) {
        self.buckets[sample.kind.index()].record(sample.value);
    }

    /// Take the mean of the metric's window and reset its bucket
    ///
    /// Returns `None` (and leaves the bucket empty) when nothing was recorded.
    pub fn drain_mean(&mut self, metric: MetricKind) -> Option<f64> {
        let bucket = &mut self.buckets[metric.index()];
        let mean = bucket.mean();
        bucket.reset();
        mean
    }

    /// Zero every bucket unconditionally
    pub fn reset_all(&mut self) {
        for bucket in &mut self.buckets {
            bucket.reset();
        }
    }

    /// Inspect a bucket without draining it
    pub fn bucket(&self, metric: MetricKind) -> &AggregateBucket {
        &self.buckets[metric.index()]
    }
}
