//! MQTT connector for RoomSense
//!
//! Wraps the synchronous `rumqttc` client. The network event loop runs on a
//! dedicated thread that keeps the session alive and reconnects after
//! failures; the scheduler thread only ever enqueues messages and never
//! blocks on the network.
//!
//! ## Delivery
//!
//! Messages go out at QoS 0 without retain. `send` fails fast when the
//! session is down or the request queue is full, so a broker outage costs
//! the affected metrics and nothing else.
//!
//! ## Example
//!
//! ```rust,no_run
//! use roomsense_connectors::mqtt::{MqttConfig, MqttConnector};
//! use roomsense_connectors::Connector;
//!
//! let config = MqttConfig::new("telemetry.example.org", 8883)
//!     .with_client_id("roomsense-a152")
//!     .with_credentials("a152", "secret");
//! let mut mqtt = MqttConnector::connect(config)?;
//! mqtt.send("roomsense/a152-co2", br#"{"value":412.5}"#)?;
//! # Ok::<(), roomsense_connectors::mqtt::MqttError>(())
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Outgoing, Packet,
    Transport,
};
use thiserror::Error;

pub use rumqttc::QoS;

use crate::{ConnectionStats, Connector};

/// Pause between reconnect attempts
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Shortest keep-alive the broker session accepts
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Session is down, message dropped
    #[error("not connected to broker")]
    NotConnected,

    /// Client request queue refused the message
    #[error("client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Invalid connector configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Event loop thread could not be started
    #[error("cannot start connection thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// MQTT configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Username and password
    pub credentials: Option<(String, String)>,
    /// TLS with the platform root store
    pub tls: bool,
    /// Requests buffered between the scheduler and the event loop
    pub capacity: usize,
    pub qos: QoS,
}

impl MqttConfig {
    /// TLS on, 60 s keep-alive, QoS 0
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: format!("roomsense-{}", std::process::id()),
            keep_alive: Duration::from_secs(60),
            credentials: None,
            tls: true,
            capacity: 32,
            qos: QoS::AtMostOnce,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Plain TCP, for a broker on the local network
    pub fn without_tls(mut self) -> Self {
        self.tls = false;
        self
    }

    pub fn validate(&self) -> Result<(), MqttError> {
        if self.host.trim().is_empty() {
            return Err(MqttError::Config("broker host is empty".into()));
        }
        if self.port == 0 {
            return Err(MqttError::Config("broker port is zero".into()));
        }
        if self.client_id.is_empty() {
            return Err(MqttError::Config("client id is empty".into()));
        }
        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(MqttError::Config(format!(
                "keep-alive must be at least {} s",
                MIN_KEEP_ALIVE.as_secs()
            )));
        }
        if self.capacity == 0 {
            return Err(MqttError::Config("request capacity is zero".into()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username.clone(), password.clone());
        }
        if self.tls {
            options.set_transport(Transport::tls_with_default_config());
        }
        options
    }
}

/// MQTT connector backed by a background event loop
pub struct MqttConnector {
    client: Client,
    qos: QoS,
    connected: Arc<AtomicBool>,
    reconnections: Arc<AtomicU32>,
    stats: ConnectionStats,
    _event_loop: JoinHandle<()>,
}

impl MqttConnector {
    /// Start the session; returns before the broker has acknowledged it
    pub fn connect(config: MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;

        let (client, connection) = Client::new(config.options(), config.capacity);
        let connected = Arc::new(AtomicBool::new(false));
        let reconnections = Arc::new(AtomicU32::new(0));

        log::info!(
            "connecting to mqtt{}://{}:{} as {}",
            if config.tls { "s" } else { "" },
            config.host,
            config.port,
            config.client_id
        );

        let event_loop = {
            let connected = Arc::clone(&connected);
            let reconnections = Arc::clone(&reconnections);
            thread::Builder::new()
                .name("mqtt-event-loop".into())
                .spawn(move || drive(connection, &connected, &reconnections))?
        };

        Ok(Self {
            client,
            qos: config.qos,
            connected,
            reconnections,
            stats: ConnectionStats::default(),
            _event_loop: event_loop,
        })
    }
}

/// Poll the connection until the client disconnects or is dropped
fn drive(mut connection: Connection, connected: &AtomicBool, reconnections: &AtomicU32) {
    let mut acked_once = false;

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    if acked_once {
                        reconnections.fetch_add(1, Ordering::Relaxed);
                    }
                    acked_once = true;
                    connected.store(true, Ordering::Release);
                    log::info!("mqtt session established");
                } else {
                    log::error!("broker refused session: {:?}", ack.code);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Release);
                log::warn!("broker closed the session");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::Release);
                log::debug!("mqtt session closed");
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                connected.store(false, Ordering::Release);
                break;
            }
            Err(e) => {
                if connected.swap(false, Ordering::AcqRel) {
                    log::warn!("mqtt connection lost: {}", e);
                } else {
                    log::debug!("mqtt connect attempt failed: {}", e);
                }
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
}

impl Connector for MqttConnector {
    type Error = MqttError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        if !self.is_connected() {
            self.stats.record_failure(MqttError::NotConnected);
            return Err(MqttError::NotConnected);
        }

        match self.client.try_publish(topic, self.qos, false, data.to_vec()) {
            Ok(()) => {
                self.stats.record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_failure(&e);
                Err(e.into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn stats(&self) -> ConnectionStats {
        let mut stats = self.stats.clone();
        stats.reconnections = self.reconnections.load(Ordering::Relaxed);
        stats
    }
}

impl Drop for MqttConnector {
    fn drop(&mut self) {
        if let Err(e) = self.client.disconnect() {
            log::debug!("mqtt disconnect on shutdown failed: {}", e);
        }
    }
}
