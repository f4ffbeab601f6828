//! Shared test doubles for integration tests
//!
//! Every double keeps its state behind `Arc<Mutex<_>>` so a test can hand
//! the boxed device to the scheduler and still script or inspect it.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use roomsense_core::baseline::BaselineSnapshot;
use roomsense_core::errors::{PublishError, SensorError, StoreError};
use roomsense_core::metrics::ContactId;
use roomsense_core::scheduler::{Devices, Scheduler, TickReport};
use roomsense_core::time::Timestamp;
use roomsense_core::traits::{
    Baseline, ClimateReading, ClimateSensor, ContactSensor, Publisher, VocReading, VocSensor,
};
use roomsense_core::BaselineStore;

pub const T0: Timestamp = 1_700_000_000_000;
pub const LOCATION: &str = "a152";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

#[derive(Debug)]
pub struct VocState {
    pub scripted: VecDeque<Result<VocReading, SensorError>>,
    pub steady: VocReading,
    pub reads: usize,
    pub compensation: Vec<(f64, f64)>,
    pub baseline: Result<Baseline, SensorError>,
    pub applied: Vec<Baseline>,
}

#[derive(Debug)]
pub struct ClimateState {
    pub scripted: VecDeque<Result<ClimateReading, SensorError>>,
    pub steady: Result<ClimateReading, SensorError>,
    pub reads: usize,
}

#[derive(Debug, Default)]
pub struct ContactsState {
    pub door_open: bool,
    pub window_open: bool,
    pub failing: bool,
}

#[derive(Debug, Default)]
pub struct PublishState {
    pub sent: Vec<(String, f64)>,
    pub reject: Vec<String>,
}

impl PublishState {
    pub fn values_for(&self, name: &str) -> Vec<f64> {
        self.sent
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

pub struct MockVoc(pub Arc<Mutex<VocState>>);
pub struct MockClimate(pub Arc<Mutex<ClimateState>>);
pub struct MockContacts(pub Arc<Mutex<ContactsState>>);
pub struct RecordingPublisher(pub Arc<Mutex<PublishState>>);

impl VocSensor for MockVoc {
    fn read_voc(&mut self) -> Result<VocReading, SensorError> {
        let mut s = lock(&self.0);
        s.reads += 1;
        let steady = s.steady;
        s.scripted.pop_front().unwrap_or(Ok(steady))
    }

    fn set_humidity_compensation(
        &mut self,
        temperature_c: f64,
        relative_humidity: f64,
    ) -> Result<(), SensorError> {
        lock(&self.0)
            .compensation
            .push((temperature_c, relative_humidity));
        Ok(())
    }

    fn baseline(&mut self) -> Result<Baseline, SensorError> {
        lock(&self.0).baseline.clone()
    }

    fn set_baseline(&mut self, baseline: Baseline) -> Result<(), SensorError> {
        lock(&self.0).applied.push(baseline);
        Ok(())
    }
}

impl ClimateSensor for MockClimate {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        let mut s = lock(&self.0);
        s.reads += 1;
        let steady = s.steady.clone();
        s.scripted.pop_front().unwrap_or(steady)
    }
}

impl ContactSensor for MockContacts {
    fn read_contact(&mut self, contact: ContactId) -> Result<bool, SensorError> {
        let s = lock(&self.0);
        if s.failing {
            return Err(SensorError::io("gpio", "line busy"));
        }
        Ok(match contact {
            ContactId::Door => s.door_open,
            ContactId::Window => s.window_open,
        })
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, metric_name: &str, value: f64) -> Result<(), PublishError> {
        let mut s = lock(&self.0);
        if s.reject.iter().any(|r| r == metric_name) {
            return Err(PublishError::Rejected {
                metric: metric_name.to_string(),
                reason: "broker refused".into(),
            });
        }
        s.sent.push((metric_name.to_string(), value));
        Ok(())
    }
}

/// Store whose disk is always full
#[derive(Debug, Default)]
pub struct FailingStore {
    pub attempts: usize,
}

impl BaselineStore for FailingStore {
    fn append(&mut self, _: &BaselineSnapshot) -> Result<(), StoreError> {
        self.attempts += 1;
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn latest(&self) -> Result<Option<BaselineSnapshot>, StoreError> {
        Ok(None)
    }
}

pub fn climate(co2: f64, temperature_c: f64, relative_humidity: f64) -> ClimateReading {
    ClimateReading {
        co2,
        temperature_c,
        relative_humidity,
        observed_at: T0,
    }
}

/// Handles onto every double plugged into a scheduler
#[derive(Clone)]
pub struct Rig {
    pub voc: Arc<Mutex<VocState>>,
    pub climate: Arc<Mutex<ClimateState>>,
    pub contacts: Arc<Mutex<ContactsState>>,
    pub published: Arc<Mutex<PublishState>>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            voc: Arc::new(Mutex::new(VocState {
                scripted: VecDeque::new(),
                steady: VocReading { eco2: 400, tvoc: 12 },
                reads: 0,
                compensation: Vec::new(),
                baseline: Ok(Baseline {
                    eco2: 37195,
                    tvoc: 37419,
                }),
                applied: Vec::new(),
            })),
            climate: Arc::new(Mutex::new(ClimateState {
                scripted: VecDeque::new(),
                steady: Ok(climate(410.0, 21.5, 40.0)),
                reads: 0,
            })),
            contacts: Arc::new(Mutex::new(ContactsState::default())),
            published: Arc::new(Mutex::new(PublishState::default())),
        }
    }

    pub fn devices(&self) -> Devices {
        Devices {
            voc: Box::new(MockVoc(self.voc.clone())),
            climate: Box::new(MockClimate(self.climate.clone())),
            contacts: Box::new(MockContacts(self.contacts.clone())),
            publisher: Box::new(RecordingPublisher(self.published.clone())),
        }
    }

    pub fn voc(&self) -> MutexGuard<'_, VocState> {
        lock(&self.voc)
    }

    pub fn climate(&self) -> MutexGuard<'_, ClimateState> {
        lock(&self.climate)
    }

    pub fn contacts(&self) -> MutexGuard<'_, ContactsState> {
        lock(&self.contacts)
    }

    pub fn published(&self) -> MutexGuard<'_, PublishState> {
        lock(&self.published)
    }
}

/// Tick at every wake-up the scheduler asks for, up to and including `until`
pub fn run_until<S: BaselineStore>(
    scheduler: &mut Scheduler<S>,
    until: Timestamp,
) -> Vec<(Timestamp, TickReport)> {
    let mut reports = Vec::new();
    loop {
        let now = scheduler.next_wake();
        if now > until {
            return reports;
        }
        reports.push((now, scheduler.tick(now)));
    }
}

/// Tick until the next publish cycle runs
pub fn run_to_next_publish<S: BaselineStore>(
    scheduler: &mut Scheduler<S>,
) -> (Timestamp, TickReport) {
    loop {
        let now = scheduler.next_wake();
        let report = scheduler.tick(now);
        if report.publish.is_some() {
            return (now, report);
        }
    }
}
