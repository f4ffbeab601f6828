//! Door and window switches on sysfs GPIO lines
//!
//! Each switch pulls its line high when closed (pull-down wiring), so the
//! raw level is converted through [`ContactLevel`] rather than negated
//! inline.

use std::fs;
use std::path::{Path, PathBuf};

use roomsense_core::errors::SensorError;
use roomsense_core::metrics::ContactId;
use roomsense_core::traits::{ContactLevel, ContactSensor};

/// Reads `{root}/gpio{N}/value` for each contact
#[derive(Debug, Clone)]
pub struct SysfsContacts {
    lines: [PathBuf; 2],
}

impl SysfsContacts {
    /// Export the lines if needed and configure them as inputs
    pub fn open(root: &Path, door_gpio: u32, window_gpio: u32) -> Result<Self, SensorError> {
        let mut lines = [PathBuf::new(), PathBuf::new()];

        for (contact, gpio) in [(ContactId::Door, door_gpio), (ContactId::Window, window_gpio)] {
            let device = contact.wire_name();
            let dir = root.join(format!("gpio{}", gpio));

            if !dir.exists() {
                fs::write(root.join("export"), gpio.to_string())
                    .map_err(|e| SensorError::io(device, format!("export gpio{}: {}", gpio, e)))?;
            }
            fs::write(dir.join("direction"), "in")
                .map_err(|e| SensorError::io(device, format!("gpio{} direction: {}", gpio, e)))?;

            log::info!("{} contact on gpio{}", contact, gpio);
            lines[contact.index()] = dir.join("value");
        }

        Ok(Self { lines })
    }

    fn level(&self, contact: ContactId) -> Result<ContactLevel, SensorError> {
        let device = contact.wire_name();
        let raw = fs::read_to_string(&self.lines[contact.index()])
            .map_err(|e| SensorError::io(device, e.to_string()))?;

        match raw.trim() {
            "1" => Ok(ContactLevel::High),
            "0" => Ok(ContactLevel::Low),
            _ => Err(SensorError::InvalidData {
                device,
                reason: "gpio value is neither 0 nor 1",
            }),
        }
    }
}

impl ContactSensor for SysfsContacts {
    fn read_contact(&mut self, contact: ContactId) -> Result<bool, SensorError> {
        Ok(self.level(contact)?.is_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_root(door: &str, window: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for (gpio, value) in [(4, door), (17, window)] {
            let dir = root.path().join(format!("gpio{}", gpio));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("value"), value).unwrap();
        }
        root
    }

    #[test]
    fn high_line_means_closed() {
        let root = fake_root("1\n", "0\n");
        let mut contacts = SysfsContacts::open(root.path(), 4, 17).unwrap();

        assert!(!contacts.read_contact(ContactId::Door).unwrap());
        assert!(contacts.read_contact(ContactId::Window).unwrap());
        assert_eq!(
            fs::read_to_string(root.path().join("gpio4/direction")).unwrap(),
            "in"
        );
    }

    #[test]
    fn garbage_value_is_an_error() {
        let root = fake_root("x", "1");
        let mut contacts = SysfsContacts::open(root.path(), 4, 17).unwrap();
        assert!(matches!(
            contacts.read_contact(ContactId::Door),
            Err(SensorError::InvalidData { device: "door", .. })
        ));
    }

    #[test]
    fn missing_line_is_exported() {
        let root = tempfile::tempdir().unwrap();
        // No gpio directories and the export file cannot create them
        let err = SysfsContacts::open(root.path(), 4, 17);
        assert_eq!(
            fs::read_to_string(root.path().join("export")).unwrap(),
            "4"
        );
        assert!(err.is_err());
    }
}
