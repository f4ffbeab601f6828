//! Publish port - one named metric value at a time
//!
//! Delivery is best-effort. A failed publish is logged by the caller and
//! never retried; stale values are not resent.

use crate::errors::PublishError;

/// Sends a single metric to the telemetry endpoint
pub trait Publisher {
    /// Publish `value` under the fully composed `metric_name` (`"{location}-{metric}"`)
    fn publish(&mut self, metric_name: &str, value: f64) -> Result<(), PublishError>;
}

impl<T: Publisher + ?Sized> Publisher for Box<T> {
    fn publish(&mut self, metric_name: &str, value: f64) -> Result<(), PublishError> {
        (**self).publish(metric_name, value)
    }
}

/// Platform value for a contact state: `1.0` closed, `0.0` open
pub fn contact_value(open: bool) -> f64 {
    if open {
        0.0
    } else {
        1.0
    }
}
