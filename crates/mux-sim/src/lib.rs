//! MUX Board Simulation
//!
//! A protocol-accurate simulation of the MUX controller firmware for
//! development and testing without hardware. [`SimBus`] answers the wire
//! protocol exactly as the firmware does, and [`run_sim_bus`] serves it over
//! any async byte stream, typically one end of `tokio::io::duplex()`.

pub mod bus;

pub use bus::{run_sim_bus, FailureMode, SimBus, SimBusConfig};
