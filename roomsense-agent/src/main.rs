//! RoomSense agent - samples room air quality and contacts, publishes means
//!
//! ```text
//! roomsense-agent --config /etc/roomsense.toml run
//! roomsense-agent --simulate --simulate-contacts --dry-run run --run-for-secs 300
//! roomsense-agent baseline --unit h
//! roomsense-agent check-config
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use roomsense_core::baseline::{time_since_latest, BaselineStore, JsonLinesBaselineStore};
use roomsense_core::time::{to_rfc3339, SystemTime, TimeSource, TimeUnit};

mod drivers;
mod runner;
mod settings;

use runner::RunOptions;
use settings::AgentConfig;

/// RoomSense telemetry agent
#[derive(Parser)]
#[command(name = "roomsense-agent")]
#[command(about = "Room air quality and contact telemetry agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ROOMSENSE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<log::LevelFilter>,

    /// Override the configured location identifier
    #[arg(long)]
    location: Option<String>,

    /// MQTT password
    #[arg(long, env = "ROOMSENSE_MQTT_PASSWORD", hide_env_values = true)]
    mqtt_password: Option<String>,

    /// Log metrics instead of publishing them
    #[arg(long)]
    dry_run: bool,

    /// Use simulated air sensors
    #[arg(long)]
    simulate: bool,

    /// Use simulated door and window contacts instead of GPIO lines
    #[arg(long)]
    simulate_contacts: bool,

    /// Seed for simulated devices
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sampling loop (default)
    Run {
        /// Stop after this many seconds
        #[arg(long)]
        run_for_secs: Option<u64>,
    },

    /// Show the latest persisted baseline and its age
    Baseline {
        /// Unit for the age: s, m, h or d
        #[arg(long, default_value = "h")]
        unit: TimeUnit,
    },

    /// Load and validate the configuration, then exit
    CheckConfig,
}

fn init_logging(level: Option<log::LevelFilter>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AgentConfig> {
    let mut config = AgentConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(location) = &cli.location {
        config.location_id = location.clone();
    }
    if let Some(password) = &cli.mqtt_password {
        config.mqtt.password = Some(password.clone());
    }
    Ok(config)
}

fn show_baseline(config: &AgentConfig, unit: TimeUnit) -> anyhow::Result<()> {
    let store = JsonLinesBaselineStore::new(&config.baseline.path);
    let (_, stats) = store
        .scan()
        .with_context(|| format!("reading {}", store.path().display()))?;

    println!(
        "{}: {} records, {} skipped",
        store.path().display(),
        stats.records,
        stats.skipped
    );

    match store.latest()? {
        Some(latest) => {
            let age = time_since_latest(&store, SystemTime.now(), unit)?.unwrap_or_default();
            println!(
                "latest: eco2_base={} tvoc_base={} captured {} ({:.2}{} ago){}",
                latest.eco2_base,
                latest.tvoc_base,
                to_rfc3339(latest.captured_at),
                age,
                unit,
                if latest.is_calibrating { " while calibrating" } else { "" }
            );
        }
        None => println!("no baseline captured yet"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let config = load_config(&cli)?;

    match &cli.command {
        None => runner::run(config, run_options(&cli, None)),
        Some(Command::Run { run_for_secs }) => runner::run(config, run_options(&cli, *run_for_secs)),
        Some(Command::Baseline { unit }) => show_baseline(&config, *unit),
        Some(Command::CheckConfig) => {
            config.validate(cli.dry_run)?;
            println!("{}", toml::to_string_pretty(&config)?);
            println!("configuration OK");
            Ok(())
        }
    }
}

fn run_options(cli: &Cli, run_for_secs: Option<u64>) -> RunOptions {
    RunOptions {
        dry_run: cli.dry_run,
        simulate: cli.simulate,
        simulate_contacts: cli.simulate_contacts,
        seed: cli.seed,
        run_for: run_for_secs.map(Duration::from_secs),
    }
}
