//! Ports to the outside world
//!
//! The core never talks to I2C, GPIO or the network directly. It consumes
//! the capabilities below, and the agent binary plugs concrete adapters in:
//!
//! - [`VocSensor`] - fast VOC sensor (eCO2/TVOC pair, baseline, humidity compensation)
//! - [`ClimateSensor`] - slow CO2/temperature/humidity sensor
//! - [`ContactSensor`] - binary door/window switches
//! - [`Publisher`] - sends one named metric value
//!
//! Every call may block for its I/O latency; the scheduler tolerates that.

pub mod publish;
pub mod sensor;

pub use publish::{contact_value, Publisher};
pub use sensor::{
    Baseline, ClimateReading, ClimateSensor, ContactLevel, ContactSensor, VocReading, VocSensor,
};
