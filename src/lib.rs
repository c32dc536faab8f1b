//! Converts a flight controller's unified target config into a board plan
//! whose every pin is checked against the MCU's pin capability table.
pub mod board;
pub mod bus;
pub mod config;
pub mod pinmap;
pub mod pins;
pub mod pipeline;
pub mod protocol;
pub mod resolve;
pub mod target;

pub use pipeline::{Conversion, convert};
