//! Sensor ports - abstraction over the physical drivers
//!
//! These traits allow the scheduler to sample sensors without knowing the
//! bus transactions behind them (Linux I2C, simulated devices, test mocks).

use serde::{Deserialize, Serialize};

use crate::errors::SensorError;
use crate::metrics::{ContactId, MetricKind, MetricSample};
use crate::time::Timestamp;

/// One measurement from the fast VOC sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocReading {
    /// Equivalent CO2 in ppm
    pub eco2: u16,
    /// Total VOC in ppb
    pub tvoc: u16,
}

impl VocReading {
    /// eCO2 and TVOC samples stamped with the tick that read them
    pub fn samples(self, observed_at: Timestamp) -> [MetricSample; 2] {
        [
            MetricSample::new(MetricKind::Eco2, f64::from(self.eco2), observed_at),
            MetricSample::new(MetricKind::Tvoc, f64::from(self.tvoc), observed_at),
        ]
    }
}

/// One measurement from the slow NDIR sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// CO2 in ppm
    pub co2: f64,
    /// Temperature in °C
    pub temperature_c: f64,
    /// Relative humidity in %
    pub relative_humidity: f64,
    /// When the device produced the reading
    pub observed_at: Timestamp,
}

impl ClimateReading {
    /// CO2, temperature and humidity samples
    pub fn samples(&self) -> [MetricSample; 3] {
        [
            MetricSample::new(MetricKind::Co2, self.co2, self.observed_at),
            MetricSample::new(MetricKind::Temperature, self.temperature_c, self.observed_at),
            MetricSample::new(
                MetricKind::RelativeHumidity,
                self.relative_humidity,
                self.observed_at,
            ),
        ]
    }
}

/// VOC sensor baseline pair
///
/// The sensor drifts and self-corrects against this pair. Restoring a
/// persisted pair on startup skips the long warm-up recalibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    /// eCO2 baseline word
    pub eco2: u16,
    /// TVOC baseline word
    pub tvoc: u16,
}

/// Port for the fast (1 Hz) VOC sensor
pub trait VocSensor {
    /// Read the current eCO2/TVOC pair
    fn read_voc(&mut self) -> Result<VocReading, SensorError>;

    /// Feed ambient temperature and humidity for absolute-humidity compensation
    fn set_humidity_compensation(
        &mut self,
        temperature_c: f64,
        relative_humidity: f64,
    ) -> Result<(), SensorError>;

    /// Current baseline pair held by the device
    fn baseline(&mut self) -> Result<Baseline, SensorError>;

    /// Overwrite the device baseline
    fn set_baseline(&mut self, baseline: Baseline) -> Result<(), SensorError>;
}

/// Port for the slow CO2/temperature/humidity sensor
pub trait ClimateSensor {
    /// Read CO2, temperature and humidity
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Electrical level of a contact line
///
/// Switches are wired to inputs with pull-down resistors. A closed switch
/// pulls the line high, so **high = closed** and **low = open**. Adapters
/// convert through this type instead of negating levels inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactLevel {
    /// Line pulled high, switch closed
    High,
    /// Line low, switch open
    Low,
}

impl ContactLevel {
    /// Level from a raw `high` bit
    pub fn from_high(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Whether the door/window is open
    pub fn is_open(self) -> bool {
        self == Self::Low
    }
}

/// Port for the door and window switches
pub trait ContactSensor {
    /// `true` when the contact is open
    fn read_contact(&mut self, contact: ContactId) -> Result<bool, SensorError>;
}

impl<T: VocSensor + ?Sized> VocSensor for Box<T> {
    fn read_voc(&mut self) -> Result<VocReading, SensorError> {
        (**self).read_voc()
    }

    fn set_humidity_compensation(
        &mut self,
        temperature_c: f64,
        relative_humidity: f64,
    ) -> Result<(), SensorError> {
        (**self).set_humidity_compensation(temperature_c, relative_humidity)
    }

    fn baseline(&mut self) -> Result<Baseline, SensorError> {
        (**self).baseline()
    }

    fn set_baseline(&mut self, baseline: Baseline) -> Result<(), SensorError> {
        (**self).set_baseline(baseline)
    }
}

impl<T: ClimateSensor + ?Sized> ClimateSensor for Box<T> {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        (**self).read_climate()
    }
}

impl<T: ContactSensor + ?Sized> ContactSensor for Box<T> {
    fn read_contact(&mut self, contact: ContactId) -> Result<bool, SensorError> {
        (**self).read_contact(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_down_polarity() {
        assert!(!ContactLevel::from_high(true).is_open());
        assert!(ContactLevel::from_high(false).is_open());
    }

    #[test]
    fn readings_split_into_samples() {
        let voc = VocReading { eco2: 450, tvoc: 30 }.samples(7_000);
        assert_eq!(voc[0], MetricSample::new(MetricKind::Eco2, 450.0, 7_000));
        assert_eq!(voc[1].kind, MetricKind::Tvoc);

        let climate = ClimateReading {
            co2: 610.0,
            temperature_c: 22.5,
            relative_humidity: 41.0,
            observed_at: 6_500,
        };
        let kinds: Vec<_> = climate.samples().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [MetricKind::Co2, MetricKind::Temperature, MetricKind::RelativeHumidity]
        );
        assert!(climate.samples().iter().all(|s| s.observed_at == 6_500));
    }
}
