//! Bridge from the core publish port to a byte-oriented connector

use serde::{Deserialize, Serialize};

use roomsense_core::errors::PublishError;
use roomsense_core::traits::Publisher;

use crate::Connector;

/// JSON body of every metric message
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuePayload {
    pub value: f64,
}

/// Round to 4 decimals; means of integer streams carry long fractions
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Encode `value` as a `{"value": x}` JSON body
pub fn encode_payload(metric_name: &str, value: f64) -> Result<Vec<u8>, PublishError> {
    if !value.is_finite() {
        return Err(PublishError::Encoding {
            metric: metric_name.to_string(),
            reason: format!("non-finite value {}", value),
        });
    }

    serde_json::to_vec(&ValuePayload {
        value: round4(value),
    })
    .map_err(|e| PublishError::Encoding {
        metric: metric_name.to_string(),
        reason: e.to_string(),
    })
}

/// Publishes metrics as JSON messages under `{prefix}/{metric_name}`
pub struct MetricPublisher<C> {
    connector: C,
    topic_prefix: String,
}

impl<C: Connector> MetricPublisher<C> {
    /// An empty prefix publishes under the bare metric name
    pub fn new(connector: C, topic_prefix: impl Into<String>) -> Self {
        Self {
            connector,
            topic_prefix: topic_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn topic(&self, metric_name: &str) -> String {
        if self.topic_prefix.is_empty() {
            metric_name.to_string()
        } else {
            format!("{}/{}", self.topic_prefix, metric_name)
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: Connector> Publisher for MetricPublisher<C> {
    fn publish(&mut self, metric_name: &str, value: f64) -> Result<(), PublishError> {
        let payload = encode_payload(metric_name, value)?;

        if !self.connector.is_connected() {
            return Err(PublishError::NotConnected);
        }

        let topic = self.topic(metric_name);
        self.connector
            .send(&topic, &payload)
            .map_err(|e| PublishError::Rejected {
                metric: metric_name.to_string(),
                reason: e.to_string(),
            })
    }
}
