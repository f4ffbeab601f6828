//! Log-only connector for dry runs

use crate::{ConnectionStats, Connector, ConnectorError};

/// Writes every message to the log instead of a network
#[derive(Debug, Default)]
pub struct LogConnector {
    stats: ConnectionStats,
    history: Option<Vec<(String, Vec<u8>)>>,
    capacity: usize,
}

impl LogConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep up to `capacity` messages in memory
    ///
    /// Sends beyond that fail with [`ConnectorError::BufferFull`].
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history = Some(Vec::with_capacity(capacity));
        self.capacity = capacity;
        self
    }

    /// Messages kept since creation, if history is enabled
    pub fn history(&self) -> &[(String, Vec<u8>)] {
        self.history.as_deref().unwrap_or(&[])
    }
}

impl Connector for LogConnector {
    type Error = ConnectorError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        if let Some(history) = &mut self.history {
            if history.len() >= self.capacity {
                self.stats.record_failure(ConnectorError::BufferFull);
                return Err(ConnectorError::BufferFull);
            }
            history.push((topic.to_string(), data.to_vec()));
        }
        log::info!("[dry-run] {} {}", topic, String::from_utf8_lossy(data));
        self.stats.record_sent(data.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
