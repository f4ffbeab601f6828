//! Sampling scheduler
//!
//! The scheduler is the single thread of control. It owns every task
//! timestamp and orchestrates the other components. `tick(now)` is called at
//! roughly 1 Hz; ticks closer together than the fast interval are ignored.
//!
//! ## Tick order
//!
//! The order below is observable (publishing before the slow read would
//! publish a stale mean) and must not change:
//!
//! 1. Read the VOC sensor, record eCO2 and TVOC
//! 2. Check door and window; publish each transition immediately
//! 3. If the slow interval elapsed, read CO2/temperature/humidity and record them
//! 4. If the publish interval elapsed, drain means, publish them (except on
//!    the warm-up cycle), update humidity compensation, reset the window
//! 5. If the baseline interval elapsed, persist a baseline snapshot; then
//!    let calibration finish if its deadline has been reached
//!
//! ## Task timing
//!
//! A task is due when strictly more than its interval has elapsed since it
//! last ran. Sub-second jitter from blocking I/O is accepted, never
//! compensated.
//!
//! ## Failure policy
//!
//! No single failure stops the loop. Sensor and contact read failures skip
//! the reading; publish failures are dropped; baseline failures are counted
//! in [`HealthCounters`].

use core::time::Duration;

use crate::aggregator::Aggregator;
use crate::baseline::{BaselineSnapshot, BaselineStore};
use crate::calibration::{CalibrationManager, CalibrationPhase};
use crate::config::SchedulerConfig;
use crate::contact::{ContactChange, ContactMonitor, ContactState};
use crate::errors::{AgentError, ConfigError};
use crate::health::HealthCounters;
use crate::metrics::{metric_name, ContactId, MetricKind};
use crate::time::{elapsed_ms, offset, Timestamp};
use crate::traits::{
    contact_value, ClimateReading, ClimateSensor, ContactSensor, Publisher, VocSensor,
};

/// Humidity compensation applied before the first climate reading
pub const DEFAULT_COMPENSATION: (f64, f64) = (20.0, 50.0);

/// One periodic task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    /// How often the task runs
    pub interval: Duration,
    /// When it last ran
    pub last_run: Timestamp,
}

impl ScheduledTask {
    /// Task that last ran at `start`
    pub fn new(interval: Duration, start: Timestamp) -> Self {
        Self {
            interval,
            last_run: start,
        }
    }

    /// Strictly more than `interval` has elapsed since the last run
    pub fn is_due(&self, now: Timestamp) -> bool {
        elapsed_ms(self.last_run, now) > self.interval.as_millis() as u64
    }

    /// Record a run at `now`
    pub fn mark_run(&mut self, now: Timestamp) {
        self.last_run = now;
    }

    /// Earliest timestamp at which the task becomes due
    pub fn next_due(&self) -> Timestamp {
        offset(self.last_run, self.interval).saturating_add(1)
    }
}

/// Timestamps of every task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    /// VOC sampling
    pub fast: ScheduledTask,
    /// Climate sampling
    pub slow: ScheduledTask,
    /// Publish cycle
    pub publish: ScheduledTask,
    /// Baseline snapshot
    pub baseline: ScheduledTask,
}

impl ScheduleState {
    fn tasks_mut(&mut self) -> [&mut ScheduledTask; 4] {
        [
            &mut self.fast,
            &mut self.slow,
            &mut self.publish,
            &mut self.baseline,
        ]
    }

    /// Re-anchor tasks that appear to have run in the future
    fn rebase(&mut self, now: Timestamp) -> bool {
        let mut stepped = false;
        for task in self.tasks_mut() {
            if task.last_run > now {
                task.last_run = now;
                stepped = true;
            }
        }
        stepped
    }
}

/// Concrete drivers and transport handed to the scheduler
pub struct Devices {
    /// Fast eCO2/TVOC sensor
    pub voc: Box<dyn VocSensor>,
    /// Slow CO2/temperature/humidity sensor
    pub climate: Box<dyn ClimateSensor>,
    /// Door and window switches
    pub contacts: Box<dyn ContactSensor>,
    /// Telemetry endpoint
    pub publisher: Box<dyn Publisher>,
}

/// What happened during one publish cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    /// First cycle since start: means computed but not published
    pub warmup: bool,
    /// Means that were published successfully
    pub published: Vec<(MetricKind, f64)>,
    /// Metrics whose publish failed
    pub failed: Vec<MetricKind>,
    /// Metrics with no samples in the window
    pub empty: Vec<MetricKind>,
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// False when the tick was debounced
    pub ran: bool,
    /// VOC reading recorded
    pub fast_sampled: bool,
    /// Climate reading recorded
    pub slow_sampled: bool,
    /// Contact transitions published this tick, as (contact, open)
    pub contact_changes: Vec<(ContactId, bool)>,
    /// Publish cycle outcome, when one ran
    pub publish: Option<PublishReport>,
    /// Snapshots persisted this tick
    pub baselines: Vec<BaselineSnapshot>,
    /// Calibration moved to `Normal` this tick
    pub calibration_finished: bool,
}

/// Top-level driver of the agent
pub struct Scheduler<S> {
    schedule: ScheduleState,
    aggregator: Aggregator,
    contacts: ContactMonitor,
    calibration: CalibrationManager<S>,
    devices: Devices,
    metric_names: [String; 5],
    contact_names: [String; 2],
    started: bool,
    first_cycle: bool,
    latest_climate: Option<ClimateReading>,
    health: HealthCounters,
    reported_health: HealthCounters,
}

impl<S: BaselineStore> Scheduler<S> {
    /// Build a scheduler whose tasks are anchored at `start`
    ///
    /// Call [`Scheduler::start`] before the first tick to see the restored
    /// baseline; otherwise the first tick that does work runs it.
    pub fn new(
        config: SchedulerConfig,
        devices: Devices,
        store: S,
        start: Timestamp,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let intervals = config.intervals;
        let location = config.location_id.as_str();

        Ok(Self {
            schedule: ScheduleState {
                fast: ScheduledTask::new(intervals.fast, start),
                slow: ScheduledTask::new(intervals.slow, start),
                publish: ScheduledTask::new(intervals.publish, start),
                baseline: ScheduledTask::new(intervals.baseline, start),
            },
            aggregator: Aggregator::new(),
            contacts: ContactMonitor::new(),
            calibration: CalibrationManager::new(store, config.calibration, start),
            devices,
            metric_names: MetricKind::ALL.map(|k| metric_name(location, k.wire_name())),
            contact_names: ContactId::ALL.map(|c| metric_name(location, c.wire_name())),
            started: false,
            first_cycle: true,
            latest_climate: None,
            health: HealthCounters::default(),
            reported_health: HealthCounters::default(),
        })
    }

    /// Prepare the VOC sensor before the first tick
    ///
    /// Restores the persisted baseline (when not calibrating) and seeds the
    /// humidity compensation. Failures are logged; the agent starts anyway.
    /// Only the first call does anything.
    pub fn start(&mut self) -> Option<BaselineSnapshot> {
        if self.started {
            return None;
        }
        self.started = true;

        let restored = match self.calibration.restore(&mut *self.devices.voc) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("could not restore baseline: {}", e);
                None
            }
        };

        let (t, rh) = DEFAULT_COMPENSATION;
        if let Err(e) = self.devices.voc.set_humidity_compensation(t, rh) {
            self.health.compensation_failures += 1;
            log::warn!("initial humidity compensation failed: {}", e);
        }

        restored
    }

    /// Run every task that is due at `now`
    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        if self.schedule.rebase(now) {
            log::warn!("clock stepped backwards, re-anchoring schedule");
        }

        let mut report = TickReport::default();
        if !self.schedule.fast.is_due(now) {
            return report;
        }
        self.schedule.fast.mark_run(now);
        report.ran = true;

        if !self.started {
            self.start();
        }

        // 1. Fast sensor
        report.fast_sampled = self.sample_fast(now);

        // 2. Contacts
        report.contact_changes = self.check_contacts();

        // 3. Slow sensor, own sub-interval
        if self.schedule.slow.is_due(now) {
            report.slow_sampled = self.sample_slow();
            self.schedule.slow.mark_run(now);
        }

        // 4. Publish cycle
        if self.schedule.publish.is_due(now) {
            report.publish = Some(self.publish_cycle());
            self.schedule.publish.mark_run(now);
        }

        // 5. Baseline housekeeping
        if self.schedule.baseline.is_due(now) {
            if let Some(snapshot) = self.log_baseline(now) {
                report.baselines.push(snapshot);
            }
            self.schedule.baseline.mark_run(now);
        }
        if let Some(done) = self.calibration.on_tick(now, &mut *self.devices.voc) {
            report.calibration_finished = true;
            match done.persisted {
                Ok(snapshot) => report.baselines.push(snapshot),
                Err(_) => self.health.baseline_persist_failures += 1,
            }
        }

        report
    }

    /// When the next tick can do any work
    pub fn next_wake(&self) -> Timestamp {
        self.schedule.fast.next_due()
    }

    /// Fault and activity counters
    pub fn health(&self) -> HealthCounters {
        self.health
    }

    /// Calibration phase
    pub fn phase(&self) -> CalibrationPhase {
        self.calibration.phase()
    }

    /// Task timestamps
    pub fn schedule(&self) -> &ScheduleState {
        &self.schedule
    }

    /// Current window
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Last seen contact states
    pub fn contact_state(&self) -> ContactState {
        self.contacts.state()
    }

    /// Calibration state and its store
    pub fn calibration(&self) -> &CalibrationManager<S> {
        &self.calibration
    }

    /// No publish cycle has completed yet
    pub fn is_warming_up(&self) -> bool {
        self.first_cycle
    }

    fn sample_fast(&mut self, now: Timestamp) -> bool {
        match self.devices.voc.read_voc() {
            Ok(reading) => {
                for sample in reading.samples(now) {
                    self.aggregator.record(sample);
                }
                log::trace!("voc eco2={} tvoc={}", reading.eco2, reading.tvoc);
                true
            }
            Err(e) => {
                self.health.sensor_read_failures += 1;
                log::warn!("skipping VOC reading: {}", e);
                false
            }
        }
    }

    fn check_contacts(&mut self) -> Vec<(ContactId, bool)> {
        let mut changes = Vec::new();

        for contact in ContactId::ALL {
            let open = match self.devices.contacts.read_contact(contact) {
                Ok(open) => open,
                Err(e) => {
                    // Treated as unchanged
                    self.health.contact_read_failures += 1;
                    log::warn!("skipping {} check: {}", contact, e);
                    continue;
                }
            };

            if let ContactChange::Changed { open } = self.contacts.check(contact, open) {
                let name = &self.contact_names[contact.index()];
                log::info!("{} {}", contact, if open { "opened" } else { "closed" });
                Self::send(
                    &mut *self.devices.publisher,
                    &mut self.health,
                    name,
                    contact_value(open),
                );
                changes.push((contact, open));
            }
        }

        changes
    }

    fn sample_slow(&mut self) -> bool {
        match self.devices.climate.read_climate() {
            Ok(reading) => {
                for sample in reading.samples() {
                    self.aggregator.record(sample);
                }
                log::trace!(
                    "climate co2={:.0} t={:.2} rh={:.1}",
                    reading.co2,
                    reading.temperature_c,
                    reading.relative_humidity
                );
                self.latest_climate = Some(reading);
                true
            }
            Err(e) => {
                self.health.sensor_read_failures += 1;
                log::warn!("skipping climate reading: {}", e);
                false
            }
        }
    }

    fn publish_cycle(&mut self) -> PublishReport {
        let mut report = PublishReport {
            warmup: self.first_cycle,
            ..PublishReport::default()
        };

        let mut means = [None; 5];
        for kind in MetricKind::ALL {
            means[kind.index()] = self.aggregator.drain_mean(kind);
            if means[kind.index()].is_none() {
                // Publish interval shorter than a feeder interval, or every read failed
                self.health.empty_windows += 1;
                report.empty.push(kind);
                log::error!("no {} samples in publish window, not publishing it", kind);
            }
        }

        if !self.first_cycle {
            for kind in MetricKind::ALL {
                let Some(mean) = means[kind.index()] else {
                    continue;
                };
                let name = &self.metric_names[kind.index()];
                if Self::send(&mut *self.devices.publisher, &mut self.health, name, mean) {
                    report.published.push((kind, mean));
                } else {
                    report.failed.push(kind);
                }
            }

            let t = means[MetricKind::Temperature.index()];
            let rh = means[MetricKind::RelativeHumidity.index()];
            if let (Some(t), Some(rh)) = (t, rh) {
                self.compensate(t, rh);
            }
        } else {
            log::info!("warm-up window complete, publishing from the next cycle");
        }

        if let Some(raw) = self.latest_climate {
            self.compensate(raw.temperature_c, raw.relative_humidity);
        }

        self.aggregator.reset_all();
        self.first_cycle = false;
        self.health.publish_cycles += 1;
        self.report_health();

        report
    }

    fn log_baseline(&mut self, now: Timestamp) -> Option<BaselineSnapshot> {
        let result = self
            .devices
            .voc
            .baseline()
            .map_err(AgentError::from)
            .and_then(|b| Ok(self.calibration.on_baseline_interval_elapsed(b, now)?));

        match result {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                self.health.baseline_persist_failures += 1;
                log::warn!("baseline snapshot lost: {}", e);
                None
            }
        }
    }

    fn compensate(&mut self, temperature_c: f64, relative_humidity: f64) {
        if let Err(e) = self
            .devices
            .voc
            .set_humidity_compensation(temperature_c, relative_humidity)
        {
            self.health.compensation_failures += 1;
            log::warn!("humidity compensation update failed: {}", e);
        }
    }

    fn send(
        publisher: &mut dyn Publisher,
        health: &mut HealthCounters,
        name: &str,
        value: f64,
    ) -> bool {
        match publisher.publish(name, value) {
            Ok(()) => {
                health.publishes_sent += 1;
                log::debug!("sent {} = {:.4}", name, value);
                true
            }
            Err(e) => {
                health.publish_failures += 1;
                log::warn!("dropping {}: {}", name, e);
                false
            }
        }
    }

    fn report_health(&mut self) {
        if self.health.has_failures() && self.health != self.reported_health {
            log::warn!("health: {}", self.health);
            self.reported_health = self.health;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_due_strictly_after_interval() {
        let task = ScheduledTask::new(Duration::from_secs(6), 10_000);
        assert!(!task.is_due(10_000));
        assert!(!task.is_due(16_000));
        assert!(task.is_due(16_001));
        assert_eq!(task.next_due(), 16_001);
    }

    #[test]
    fn rebase_pulls_future_timestamps_back() {
        let mut state = ScheduleState {
            fast: ScheduledTask::new(Duration::from_secs(1), 50_000),
            slow: ScheduledTask::new(Duration::from_secs(6), 10_000),
            publish: ScheduledTask::new(Duration::from_secs(60), 50_000),
            baseline: ScheduledTask::new(Duration::from_secs(3600), 10_000),
        };

        assert!(state.rebase(20_000));
        assert_eq!(state.fast.last_run, 20_000);
        assert_eq!(state.slow.last_run, 10_000);
        assert!(!state.rebase(20_000));
    }
}
