//! Simulated devices
//!
//! Bounded random walks around typical indoor values. The VOC sensor keeps
//! the baseline and compensation it is given so calibration and restore can
//! be exercised end to end without hardware.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use roomsense_core::errors::SensorError;
use roomsense_core::metrics::ContactId;
use roomsense_core::time::{SystemTime, TimeSource};
use roomsense_core::traits::{
    Baseline, ClimateReading, ClimateSensor, ContactSensor, VocReading, VocSensor,
};

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Step `value` by up to `step` and clamp to `[lo, hi]`
fn walk(rng: &mut StdRng, value: f64, step: f64, lo: f64, hi: f64) -> f64 {
    (value + rng.gen_range(-step..=step)).clamp(lo, hi)
}

/// SGP30-like eCO2/TVOC source
pub struct SimulatedVoc {
    rng: StdRng,
    eco2: f64,
    tvoc: f64,
    baseline: Baseline,
    compensation: Option<(f64, f64)>,
}

impl SimulatedVoc {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng(seed),
            eco2: 450.0,
            tvoc: 40.0,
            baseline: Baseline {
                eco2: 0x8f3b,
                tvoc: 0x9223,
            },
            compensation: None,
        }
    }

    /// Last humidity compensation applied
    #[cfg(test)]
    pub fn compensation(&self) -> Option<(f64, f64)> {
        self.compensation
    }
}

impl VocSensor for SimulatedVoc {
    fn read_voc(&mut self) -> Result<VocReading, SensorError> {
        self.eco2 = walk(&mut self.rng, self.eco2, 8.0, 400.0, 2000.0);
        self.tvoc = walk(&mut self.rng, self.tvoc, 4.0, 0.0, 600.0);

        // Uncompensated readings run high in humid air
        let humid_bias = match self.compensation {
            Some(_) => 0.0,
            None => 10.0,
        };

        // Baseline drifts slowly while the device self-calibrates
        if self.rng.gen_bool(0.01) {
            self.baseline.eco2 = self.baseline.eco2.wrapping_add(1);
        }

        Ok(VocReading {
            eco2: self.eco2.round() as u16,
            tvoc: (self.tvoc + humid_bias).min(600.0).round() as u16,
        })
    }

    fn set_humidity_compensation(
        &mut self,
        temperature_c: f64,
        relative_humidity: f64,
    ) -> Result<(), SensorError> {
        if !(0.0..=100.0).contains(&relative_humidity) {
            return Err(SensorError::InvalidData {
                device: "sgp30",
                reason: "relative humidity out of range",
            });
        }
        self.compensation = Some((temperature_c, relative_humidity));
        Ok(())
    }

    fn baseline(&mut self) -> Result<Baseline, SensorError> {
        Ok(self.baseline)
    }

    fn set_baseline(&mut self, baseline: Baseline) -> Result<(), SensorError> {
        self.baseline = baseline;
        Ok(())
    }
}

/// SCD4x-like CO2/temperature/humidity source
pub struct SimulatedClimate {
    rng: StdRng,
    co2: f64,
    temperature_c: f64,
    relative_humidity: f64,
}

impl SimulatedClimate {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng(seed),
            co2: 650.0,
            temperature_c: 21.0,
            relative_humidity: 40.0,
        }
    }
}

impl ClimateSensor for SimulatedClimate {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.co2 = walk(&mut self.rng, self.co2, 15.0, 400.0, 5000.0);
        self.temperature_c = walk(&mut self.rng, self.temperature_c, 0.1, 15.0, 30.0);
        self.relative_humidity = walk(&mut self.rng, self.relative_humidity, 0.5, 20.0, 70.0);

        Ok(ClimateReading {
            co2: self.co2.round(),
            temperature_c: self.temperature_c,
            relative_humidity: self.relative_humidity,
            observed_at: SystemTime.now(),
        })
    }
}

/// Door and window that occasionally open or close
pub struct SimulatedContacts {
    rng: StdRng,
    open: [bool; 2],
    toggle_probability: f64,
}

impl SimulatedContacts {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng(seed),
            open: [false; 2],
            toggle_probability: 0.002,
        }
    }
}

impl ContactSensor for SimulatedContacts {
    fn read_contact(&mut self, contact: ContactId) -> Result<bool, SensorError> {
        let state = &mut self.open[contact.index()];
        if self.rng.gen_bool(self.toggle_probability) {
            *state = !*state;
        }
        Ok(*state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_in_range() {
        let mut voc = SimulatedVoc::new(Some(7));
        let mut climate = SimulatedClimate::new(Some(7));

        for _ in 0..1_000 {
            let v = voc.read_voc().unwrap();
            assert!((400..=2000).contains(&v.eco2));
            assert!(v.tvoc <= 600);

            let c = climate.read_climate().unwrap();
            assert!((400.0..=5000.0).contains(&c.co2));
            assert!((20.0..=70.0).contains(&c.relative_humidity));
        }
    }

    #[test]
    fn voc_keeps_baseline_and_compensation() {
        let mut voc = SimulatedVoc::new(Some(1));
        voc.set_baseline(Baseline { eco2: 1, tvoc: 2 }).unwrap();
        voc.set_humidity_compensation(20.0, 50.0).unwrap();

        assert_eq!(voc.compensation(), Some((20.0, 50.0)));
        assert!(voc.set_humidity_compensation(20.0, 150.0).is_err());
        assert_eq!(voc.baseline().unwrap().tvoc, 2);
    }

    #[test]
    fn seeded_runs_repeat() {
        let mut a = SimulatedContacts::new(Some(42));
        let mut b = SimulatedContacts::new(Some(42));
        for _ in 0..500 {
            assert_eq!(
                a.read_contact(ContactId::Door).unwrap(),
                b.read_contact(ContactId::Door).unwrap()
            );
        }
    }
}
