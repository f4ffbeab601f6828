//! Device adapters plugged into the scheduler
//!
//! - [`sysfs`] - door and window switches on Linux sysfs GPIO lines
//! - [`simulated`] - random-walk air sensors and contacts for bench runs

pub mod simulated;
pub mod sysfs;

pub use simulated::{SimulatedClimate, SimulatedContacts, SimulatedVoc};
pub use sysfs::SysfsContacts;
