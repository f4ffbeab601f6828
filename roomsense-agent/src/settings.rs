//! Agent configuration file
//!
//! ```toml
//! location_id = "a152"
//!
//! [calibration]
//! enabled = true
//! environment = "indoor"
//!
//! [mqtt]
//! host = "telemetry.example.org"
//! username = "a152"
//! topic_prefix = "183/obj"
//! ```
//!
//! Every section is optional; omitted values take the defaults below. The
//! MQTT password is best supplied through `ROOMSENSE_MQTT_PASSWORD`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use roomsense_connectors::MqttConfig;
use roomsense_core::calibration::{CalibrationEnvironment, CalibrationMode};
use roomsense_core::config::{Intervals, SchedulerConfig};
use roomsense_core::errors::ConfigError;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "roomsense.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Room identifier, prefix of every metric name
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub calibration: CalibrationSection,
    #[serde(default)]
    pub intervals: IntervalSection,
    #[serde(default)]
    pub baseline: BaselineSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub contacts: ContactSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationSection {
    pub enabled: bool,
    pub environment: Option<CalibrationEnvironment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntervalSection {
    pub fast_secs: u64,
    pub slow_secs: u64,
    pub publish_secs: u64,
    pub baseline_secs: u64,
}

impl Default for IntervalSection {
    fn default() -> Self {
        let d = Intervals::default();
        Self {
            fast_secs: d.fast.as_secs(),
            slow_secs: d.slow.as_secs(),
            publish_secs: d.publish.as_secs(),
            baseline_secs: d.baseline.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaselineSection {
    /// JSON-lines baseline log
    pub path: PathBuf,
}

impl Default for BaselineSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("baseline.jsonl"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MqttSection {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub topic_prefix: String,
    /// Defaults to `roomsense-{location_id}`
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8883,
            tls: true,
            username: None,
            password: None,
            topic_prefix: "roomsense".into(),
            client_id: None,
            keep_alive_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactSection {
    pub door_gpio: u32,
    pub window_gpio: u32,
    /// sysfs GPIO class directory
    pub gpio_root: PathBuf,
}

impl Default for ContactSection {
    fn default() -> Self {
        Self {
            door_gpio: 4,
            window_gpio: 17,
            gpio_root: PathBuf::from("/sys/class/gpio"),
        }
    }
}

impl AgentConfig {
    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Source(e.to_string()))
    }

    /// Load from `path`
    ///
    /// A missing file is only accepted for the default path, so that a
    /// location can be given on the command line alone.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                log::debug!("loading configuration from {}", path.display());
                Self::from_toml(&contents)
                    .map_err(|e| ConfigError::Source(format!("{}: {}", path.display(), e)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                log::debug!("no {} found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Source(format!("{}: {}", path.display(), e))),
        }
    }

    /// Startup checks; credentials are not needed when nothing is sent
    pub fn validate(&self, dry_run: bool) -> Result<(), ConfigError> {
        self.scheduler_config()?.validate()?;

        if !dry_run {
            if self.mqtt.username.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingCredentials("mqtt.username"));
            }
            if self.mqtt.password.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingCredentials("mqtt.password"));
            }
            self.mqtt_config()
                .validate()
                .map_err(|e| ConfigError::Source(e.to_string()))?;
        }

        Ok(())
    }

    pub fn calibration_mode(&self) -> Result<CalibrationMode, ConfigError> {
        match (self.calibration.enabled, self.calibration.environment) {
            (false, _) => Ok(CalibrationMode::Disabled),
            (true, Some(env)) => Ok(CalibrationMode::Enabled(env)),
            (true, None) => Err(ConfigError::MissingCalibrationEnvironment),
        }
    }

    pub fn intervals(&self) -> Intervals {
        Intervals {
            fast: Duration::from_secs(self.intervals.fast_secs),
            slow: Duration::from_secs(self.intervals.slow_secs),
            publish: Duration::from_secs(self.intervals.publish_secs),
            baseline: Duration::from_secs(self.intervals.baseline_secs),
        }
    }

    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        Ok(SchedulerConfig::new(self.location_id.trim())
            .with_intervals(self.intervals())
            .with_calibration(self.calibration_mode()?))
    }

    pub fn mqtt_config(&self) -> MqttConfig {
        let mqtt = &self.mqtt;
        let client_id = mqtt
            .client_id
            .clone()
            .unwrap_or_else(|| format!("roomsense-{}", self.location_id.trim()));

        let mut config = MqttConfig::new(mqtt.host.clone(), mqtt.port)
            .with_client_id(client_id)
            .with_keep_alive(Duration::from_secs(mqtt.keep_alive_secs));
        if let (Some(user), Some(pass)) = (&mqtt.username, &mqtt.password) {
            config = config.with_credentials(user.clone(), pass.clone());
        }
        if !mqtt.tls {
            config = config.without_tls();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        location_id = "a152"

        [calibration]
        enabled = true
        environment = "out"

        [intervals]
        publish_secs = 120

        [baseline]
        path = "/var/lib/roomsense/baseline.jsonl"

        [mqtt]
        host = "telemetry.example.org"
        username = "a152"
        password = "hunter2"
        topic_prefix = "183/obj"

        [contacts]
        door_gpio = 5
    "#;

    #[test]
    fn parses_full_file_with_defaults() {
        let config = AgentConfig::from_toml(FULL).unwrap();
        assert_eq!(config.location_id, "a152");
        assert_eq!(
            config.calibration_mode().unwrap(),
            CalibrationMode::Enabled(CalibrationEnvironment::Outdoor)
        );
        assert_eq!(config.intervals().publish, Duration::from_secs(120));
        assert_eq!(config.intervals().slow, Duration::from_secs(6));
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.contacts.door_gpio, 5);
        assert_eq!(config.contacts.window_gpio, 17);
        assert!(config.validate(false).is_ok());

        let mqtt = config.mqtt_config();
        assert_eq!(mqtt.client_id, "roomsense-a152");
        assert!(mqtt.tls);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AgentConfig::from_toml("location_id = \"a\"\nlocaton = \"b\"").unwrap_err();
        assert!(matches!(err, ConfigError::Source(_)));
    }

    #[test]
    fn invalid_environment_is_rejected() {
        let toml = "location_id = \"a\"\n[calibration]\nenabled = true\nenvironment = \"garage\"";
        assert!(AgentConfig::from_toml(toml).is_err());
    }

    #[test]
    fn calibration_needs_an_environment() {
        let config =
            AgentConfig::from_toml("location_id = \"a\"\n[calibration]\nenabled = true").unwrap();
        assert_eq!(
            config.validate(true),
            Err(ConfigError::MissingCalibrationEnvironment)
        );
    }

    #[test]
    fn credentials_required_unless_dry_run() {
        let config = AgentConfig::from_toml("location_id = \"a152\"").unwrap();
        assert!(config.validate(true).is_ok());
        assert_eq!(
            config.validate(false),
            Err(ConfigError::MissingCredentials("mqtt.username"))
        );
    }

    #[test]
    fn bad_intervals_and_location_rejected() {
        assert_eq!(
            AgentConfig::default().validate(true),
            Err(ConfigError::MissingLocation)
        );

        let config =
            AgentConfig::from_toml("location_id = \"a\"\n[intervals]\npublish_secs = 6").unwrap();
        assert!(matches!(
            config.validate(true),
            Err(ConfigError::InvalidInterval { name: "publish", .. })
        ));
    }

    #[test]
    fn missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("roomsense.toml");
        assert!(AgentConfig::load(Some(&explicit)).is_err());

        std::fs::write(&explicit, FULL).unwrap();
        assert_eq!(AgentConfig::load(Some(&explicit)).unwrap().location_id, "a152");
    }
}
