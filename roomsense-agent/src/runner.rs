//! Process wiring and the periodic-wake loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use roomsense_connectors::{LogConnector, MetricPublisher, MqttConnector};
use roomsense_core::baseline::{BaselineStore, JsonLinesBaselineStore};
use roomsense_core::scheduler::{Devices, Scheduler};
use roomsense_core::time::{elapsed_ms, offset, to_rfc3339, SystemTime, TimeSource, Timestamp};
use roomsense_core::traits::{ClimateSensor, ContactSensor, Publisher, VocSensor};

use crate::drivers::{SimulatedClimate, SimulatedContacts, SimulatedVoc, SysfsContacts};
use crate::settings::AgentConfig;

/// How the `run` command was invoked
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log metrics instead of sending them
    pub dry_run: bool,
    /// Use simulated air sensors
    pub simulate: bool,
    /// Use simulated contacts instead of GPIO lines
    pub simulate_contacts: bool,
    /// Seed for the simulated devices
    pub seed: Option<u64>,
    /// Stop after this long instead of running until interrupted
    pub run_for: Option<Duration>,
}

fn publisher(config: &AgentConfig, dry_run: bool) -> anyhow::Result<Box<dyn Publisher>> {
    let prefix = config.mqtt.topic_prefix.clone();
    if dry_run {
        log::info!("dry run, metrics are logged and not sent");
        return Ok(Box::new(MetricPublisher::new(LogConnector::new(), prefix)));
    }

    let mqtt = MqttConnector::connect(config.mqtt_config()).context("starting MQTT session")?;
    Ok(Box::new(MetricPublisher::new(mqtt, prefix)))
}

fn contacts(config: &AgentConfig, options: &RunOptions) -> anyhow::Result<Box<dyn ContactSensor>> {
    if options.simulate_contacts {
        return Ok(Box::new(SimulatedContacts::new(options.seed.map(|s| s.wrapping_add(2)))));
    }

    let c = &config.contacts;
    let contacts = SysfsContacts::open(&c.gpio_root, c.door_gpio, c.window_gpio)
        .context("opening contact GPIO lines")?;
    Ok(Box::new(contacts))
}

/// Pick drivers and transport for this run
pub fn build_devices(config: &AgentConfig, options: &RunOptions) -> anyhow::Result<Devices> {
    if !options.simulate {
        bail!(
            "no I2C air sensor driver is built into this binary; \
             run with --simulate, or embed roomsense-core with your own VocSensor and ClimateSensor"
        );
    }
    log::info!("using simulated air sensors");

    let voc: Box<dyn VocSensor> = Box::new(SimulatedVoc::new(options.seed));
    let climate: Box<dyn ClimateSensor> =
        Box::new(SimulatedClimate::new(options.seed.map(|s| s.wrapping_add(1))));

    Ok(Devices {
        voc,
        climate,
        contacts: contacts(config, options)?,
        publisher: publisher(config, options.dry_run)?,
    })
}

/// Tick whenever the scheduler asks until `stop` is set or `until` passes
///
/// Returns the number of ticks that did work.
pub fn run_loop<S, T, F>(
    scheduler: &mut Scheduler<S>,
    clock: &T,
    mut sleep: F,
    stop: &AtomicBool,
    until: Option<Timestamp>,
) -> u64
where
    S: BaselineStore,
    T: TimeSource,
    F: FnMut(Duration),
{
    let mut ticks = 0;

    while !stop.load(Ordering::Relaxed) {
        let now = clock.now();
        if until.map_or(false, |end| now >= end) {
            break;
        }

        if scheduler.tick(now).ran {
            ticks += 1;
        }

        let wake = scheduler.next_wake();
        let now = clock.now();
        if wake > now {
            sleep(Duration::from_millis(elapsed_ms(now, wake)));
        }
    }

    ticks
}

/// The `run` command
pub fn run(config: AgentConfig, options: RunOptions) -> anyhow::Result<()> {
    config.validate(options.dry_run)?;

    let devices = build_devices(&config, &options)?;
    let store = JsonLinesBaselineStore::new(&config.baseline.path);
    let clock = SystemTime;
    let start = clock.now();

    let mut scheduler = Scheduler::new(config.scheduler_config()?, devices, store, start)?;
    log::info!(
        "roomsense-agent {} starting for {} at {}",
        roomsense_core::VERSION,
        config.location_id.trim(),
        to_rfc3339(start)
    );
    scheduler.start();

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            stop.store(true, Ordering::Relaxed);
        })
        .context("installing Ctrl+C handler")?;
    }

    let until = options.run_for.map(|d| offset(start, d));
    let ticks = run_loop(&mut scheduler, &clock, std::thread::sleep, &stop, until);

    log::info!("stopped after {} ticks, {}", ticks, scheduler.health());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomsense_core::time::FixedTime;
    use roomsense_core::{MemoryBaselineStore, SchedulerConfig};

    const T0: Timestamp = 1_700_000_000_000;

    fn simulated_config() -> AgentConfig {
        AgentConfig::from_toml("location_id = \"bench\"").unwrap()
    }

    fn options() -> RunOptions {
        RunOptions {
            dry_run: true,
            simulate: true,
            simulate_contacts: true,
            seed: Some(3),
            run_for: None,
        }
    }

    #[test]
    fn gpio_contacts_need_their_lines() {
        let mut config = simulated_config();
        config.contacts.gpio_root = std::path::PathBuf::from("/nonexistent/gpio");
        let opts = RunOptions {
            simulate_contacts: false,
            ..options()
        };
        assert!(build_devices(&config, &opts).is_err());
    }

    #[test]
    fn hardware_air_sensors_are_not_available() {
        let opts = RunOptions {
            simulate: false,
            ..options()
        };
        assert!(build_devices(&simulated_config(), &opts).is_err());
    }

    #[test]
    fn loop_sleeps_until_next_wake() {
        let devices = build_devices(&simulated_config(), &options()).unwrap();
        let mut scheduler = Scheduler::new(
            SchedulerConfig::new("bench"),
            devices,
            MemoryBaselineStore::new(),
            T0,
        )
        .unwrap();
        scheduler.start();

        let clock = FixedTime::new(T0);
        let mut sleeps = Vec::new();
        let stop = AtomicBool::new(false);

        let ticks = run_loop(
            &mut scheduler,
            &clock,
            |d| {
                sleeps.push(d);
                clock.advance(d.as_millis() as u64);
            },
            &stop,
            Some(T0 + 130_000),
        );

        // Never busy-waits: every sleep reaches the next due instant
        assert!(sleeps.iter().all(|d| *d >= Duration::from_millis(1)));
        assert!(ticks >= 120);
        assert!(ticks <= 130);
        assert_eq!(scheduler.health().publish_cycles, 2);
        assert!(scheduler.health().publishes_sent >= 5);
    }

    #[test]
    fn stop_flag_ends_the_loop() {
        let devices = build_devices(&simulated_config(), &options()).unwrap();
        let mut scheduler =
            Scheduler::new(SchedulerConfig::new("bench"), devices, MemoryBaselineStore::new(), T0)
                .unwrap();
        let stop = AtomicBool::new(true);
        let clock = FixedTime::new(T0 + 5_000);

        assert_eq!(run_loop(&mut scheduler, &clock, |_| {}, &stop, None), 0);
    }
}
