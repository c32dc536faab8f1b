// src/protocol.rs - Output protocol timing table
use serde::Serialize;

/// Update rate and pulse bounds for an output protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolTiming {
    pub frequency_hz: u32,
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
}

impl ProtocolTiming {
    pub const fn new(frequency_hz: u32, min_pulse_us: u32, max_pulse_us: u32) -> Self {
        Self {
            frequency_hz,
            min_pulse_us,
            max_pulse_us,
        }
    }

    /// DSHOT variants carry no analog pulse range.
    pub fn is_digital(&self) -> bool {
        self.min_pulse_us == 0 && self.max_pulse_us == 0
    }
}

pub const SERVO_TIMING: ProtocolTiming = ProtocolTiming::new(50, 1000, 2000);
pub const DEFAULT_TIMING: ProtocolTiming = ProtocolTiming::new(1000, 125, 250);

const PROTOCOLS: &[(&str, ProtocolTiming)] = &[
    ("PWM", ProtocolTiming::new(50, 1000, 2000)),
    ("ONESHOT125", ProtocolTiming::new(1000, 125, 250)),
    ("ONESHOT42", ProtocolTiming::new(2000, 42, 84)),
    ("MULTISHOT", ProtocolTiming::new(8000, 5, 25)),
    ("DSHOT150", ProtocolTiming::new(1000, 0, 0)),
    ("DSHOT300", ProtocolTiming::new(1000, 0, 0)),
    ("DSHOT600", ProtocolTiming::new(1000, 0, 0)),
];

/// Whether `name` is a protocol in the table (case-insensitive).
pub fn is_known(name: &str) -> bool {
    PROTOCOLS.iter().any(|(known, _)| known.eq_ignore_ascii_case(name.trim()))
}

/// Timing for a protocol name. Unknown names fall back to ONESHOT125.
pub fn protocol_timing(name: &str) -> ProtocolTiming {
    let name = name.trim();
    PROTOCOLS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, timing)| *timing)
        .unwrap_or_else(|| {
            tracing::warn!("Unknown motor protocol '{}', using ONESHOT125 timing", name);
            DEFAULT_TIMING
        })
}
