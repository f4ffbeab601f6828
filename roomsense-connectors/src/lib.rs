//! Telemetry Connectors for RoomSense
//!
//! ## Overview
//!
//! The scheduler publishes one named metric value at a time through the
//! core [`Publisher`](roomsense_core::traits::Publisher) port. This crate
//! supplies the transports behind that port and the bridge that encodes a
//! value for the wire.
//!
//! ```text
//!   Scheduler ──publish(name, value)──▶ MetricPublisher ──send(topic, bytes)──▶ Connector
//!                                        (topic + JSON)                         (MQTT, log)
//! ```
//!
//! ## Connectors
//!
//! ### MQTT
//!
//! **When to use:** production. One persistent session to the telemetry
//! broker, TLS on by default, QoS 0. A metric that cannot be queued is
//! dropped; the next window produces a fresh value anyway.
//!
//! ### Log
//!
//! **When to use:** dry runs and bench testing. Every message is written to
//! the log at `info` and counted, nothing leaves the host.
//!
//! ## Wire format
//!
//! | Item | Format |
//! |------|--------|
//! | Topic | `{topic_prefix}/{location}-{metric}` |
//! | Payload | `{"value": <number>}`, rounded to 4 decimals |
//!
//! ## Security Considerations
//!
//! - Never hard-code credentials; the agent reads them from its config file
//!   or the environment
//! - Plain TCP is only for local brokers
//!
//! ## Example Usage
//!
//! ```rust
//! use roomsense_connectors::{Connector, LogConnector, MetricPublisher};
//! use roomsense_core::traits::Publisher;
//!
//! let mut publisher = MetricPublisher::new(LogConnector::new(), "roomsense");
//! publisher.publish("a152-co2", 412.5)?;
//! assert_eq!(publisher.connector().stats().messages_sent, 1);
//! # Ok::<(), roomsense_core::errors::PublishError>(())
//! ```

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub mod dry_run;
pub mod publisher;

// Re-export common types
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttError};

pub use dry_run::LogConnector;
pub use publisher::{encode_payload, MetricPublisher, ValuePayload};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Buffer full")]
    BufferFull,
}

/// Trait for all protocol connectors
pub trait Connector {
    type Error: std::fmt::Display;

    /// Send one message
    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Count a successful send of `bytes`
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Count a failed send
    pub fn record_failure(&mut self, error: impl ToString) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_track_sends_and_failures() {
        let mut stats = ConnectionStats::default();
        stats.record_sent(18);
        stats.record_sent(20);
        stats.record_failure(ConnectorError::BufferFull);

        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.bytes_sent, 38);
        assert_eq!(stats.messages_failed, 1);
        assert_eq!(stats.last_error.as_deref(), Some("Buffer full"));
    }
}
