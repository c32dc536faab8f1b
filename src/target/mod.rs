// src/target/mod.rs - Unified target config model and parser
pub mod lines;

use crate::bus::{BusKind, Signal};
use crate::pins::LogicalPin;
use lines::{TargetLine, classify};
use std::collections::{BTreeMap, BTreeSet};

/// One `resource <TYPE> <index> <pin>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePin {
    pub resource_type: String,
    pub index: u32,
    pub pin: LogicalPin,
}

/// Timer routing for a pin, assembled from the `timer` line and the
/// `# pin ...: TIMx CHy` annotation in whichever order they appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerAssignment {
    pub pin: LogicalPin,
    /// `None` while only the annotation has been seen.
    pub af: Option<u8>,
    pub timer: Option<String>,
    pub channel: Option<u8>,
}

impl TimerAssignment {
    pub fn new(pin: LogicalPin) -> Self {
        Self {
            pin,
            af: None,
            timer: None,
            channel: None,
        }
    }

    /// Copies over fields of `other` that are still unset here.
    pub fn merge(&mut self, other: TimerAssignment) {
        if self.af.is_none() {
            self.af = other.af;
        }
        if self.timer.is_none() {
            self.timer = other.timer;
        }
        if self.channel.is_none() {
            self.channel = other.channel;
        }
    }
}

/// DMA option for a pin or peripheral. The channel only comes from the
/// trailing annotation comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmaAssignment {
    pub target: String,
    pub stream: Option<u8>,
    pub channel: Option<u8>,
}

impl DmaAssignment {
    fn new(target: String) -> Self {
        Self {
            target,
            stream: None,
            channel: None,
        }
    }
}

/// Counts of classified and ignored lines for one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub recognized: usize,
    pub skipped: usize,
}

/// Logical pins of one bus group, in the kind's signal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusPins {
    pub kind: BusKind,
    pub index: u32,
    pub pins: Vec<(Signal, LogicalPin)>,
}

impl BusPins {
    pub fn get(&self, signal: Signal) -> Option<LogicalPin> {
        self.pins.iter().find(|(s, _)| *s == signal).map(|(_, pin)| *pin)
    }
}

/// Parsed unified target configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetConfig {
    pub mcu_type: Option<String>,
    pub board_name: Option<String>,
    pub manufacturer_id: Option<String>,
    pub defines: Vec<String>,
    pub resources: BTreeMap<String, Vec<ResourcePin>>,
    pub timers: BTreeMap<LogicalPin, TimerAssignment>,
    pub dma: BTreeMap<String, DmaAssignment>,
    pub features: Vec<String>,
    pub settings: BTreeMap<String, String>,
    pub stats: ParseStats,
}

impl TargetConfig {
    /// Parses target text. Never fails: missing pieces stay empty and show
    /// up later as resolution issues.
    pub fn parse(contents: &str) -> Self {
        let mut config = TargetConfig::default();

        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if config.apply(classify(line)) {
                config.stats.recognized += 1;
            } else {
                config.stats.skipped += 1;
                tracing::trace!("Skipping line {}: {}", number + 1, line);
            }
        }

        tracing::debug!(
            "Parsed target {} ({} lines used, {} skipped, {} resource types, {} timers)",
            config.board_name.as_deref().unwrap_or("<unnamed>"),
            config.stats.recognized,
            config.stats.skipped,
            config.resources.len(),
            config.timers.len()
        );
        config
    }

    fn apply(&mut self, line: TargetLine<'_>) -> bool {
        match line {
            TargetLine::Header { mcu } => {
                if self.mcu_type.is_none() {
                    self.mcu_type = mcu.map(str::to_string);
                }
            }
            TargetLine::BoardName(name) => self.board_name = Some(name.to_string()),
            TargetLine::ManufacturerId(id) => self.manufacturer_id = Some(id.to_string()),
            TargetLine::Define(define) => self.defines.push(define.to_string()),
            TargetLine::Resource {
                resource_type,
                index,
                pin,
            } => {
                let Ok(pin) = pin.parse::<LogicalPin>() else {
                    tracing::debug!("Ignoring {} {} with unusable pin '{}'", resource_type, index, pin);
                    return false;
                };
                self.resources
                    .entry(resource_type.to_string())
                    .or_default()
                    .push(ResourcePin {
                        resource_type: resource_type.to_string(),
                        index,
                        pin,
                    });
            }
            TargetLine::Timer { pin, af } => {
                let Ok(pin) = pin.parse::<LogicalPin>() else {
                    return false;
                };
                self.merge_timer(TimerAssignment {
                    af: Some(af),
                    ..TimerAssignment::new(pin)
                });
            }
            TargetLine::TimerNote {
                pin,
                timer,
                channel,
            } => {
                let Ok(pin) = pin.parse::<LogicalPin>() else {
                    return false;
                };
                self.merge_timer(TimerAssignment {
                    timer: Some(timer.to_string()),
                    channel: Some(channel),
                    ..TimerAssignment::new(pin)
                });
            }
            TargetLine::Dma { target, stream } => {
                let entry = self
                    .dma
                    .entry(target.clone())
                    .or_insert_with(|| DmaAssignment::new(target));
                entry.stream.get_or_insert(stream);
            }
            TargetLine::DmaNote { target, channel } => {
                let entry = self
                    .dma
                    .entry(target.clone())
                    .or_insert_with(|| DmaAssignment::new(target));
                entry.channel.get_or_insert(channel);
            }
            TargetLine::Feature(feature) => self.features.push(feature.to_string()),
            TargetLine::Setting { key, value } => {
                self.settings.insert(key.to_string(), value.to_string());
            }
            TargetLine::Unrecognized => return false,
        }
        true
    }

    fn merge_timer(&mut self, incoming: TimerAssignment) {
        match self.timers.get_mut(&incoming.pin) {
            Some(existing) => existing.merge(incoming),
            None => {
                self.timers.insert(incoming.pin, incoming);
            }
        }
    }

    /// All resources of one type, in file order.
    pub fn resources_of(&self, resource_type: &str) -> &[ResourcePin] {
        self.resources
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn motors(&self) -> &[ResourcePin] {
        self.resources_of("MOTOR")
    }

    pub fn servos(&self) -> &[ResourcePin] {
        self.resources_of("SERVO")
    }

    /// Pin of the lowest-indexed resource of a type (`GYRO_CS`, `FLASH_CS`...).
    pub fn first_pin(&self, resource_type: &str) -> Option<LogicalPin> {
        self.resources_of(resource_type)
            .iter()
            .min_by_key(|r| r.index)
            .map(|r| r.pin)
    }

    pub fn timer(&self, pin: LogicalPin) -> Option<&TimerAssignment> {
        self.timers.get(&pin)
    }

    /// Assembles the pins of bus `index`. Returns `None` unless every
    /// signal of the kind is present: a bus with two of three SPI signals
    /// is incomplete, not partially usable.
    pub fn bus_pins(&self, kind: BusKind, index: u32) -> Option<BusPins> {
        let pins = kind
            .signals()
            .iter()
            .map(|signal| {
                self.resources_of(signal.resource_type())
                    .iter()
                    .find(|r| r.index == index)
                    .map(|r| (*signal, r.pin))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(BusPins { kind, index, pins })
    }

    pub fn spi_pins(&self, index: u32) -> Option<BusPins> {
        self.bus_pins(BusKind::Spi, index)
    }

    pub fn i2c_pins(&self, index: u32) -> Option<BusPins> {
        self.bus_pins(BusKind::I2c, index)
    }

    pub fn uart_pins(&self, index: u32) -> Option<BusPins> {
        self.bus_pins(BusKind::Uart, index)
    }

    /// Every bus index mentioned by any signal of the kind, ascending.
    pub fn bus_indices(&self, kind: BusKind) -> Vec<u32> {
        kind.signals()
            .iter()
            .flat_map(|signal| self.resources_of(signal.resource_type()))
            .map(|r| r.index)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_define(&self, name: &str) -> bool {
        self.defines
            .iter()
            .any(|define| define.split_whitespace().nth(1) == Some(name))
    }

    /// Gyro chips enabled with `#define USE_GYRO_SPI_<CHIP>`, in file order.
    pub fn gyro_chips(&self) -> Vec<String> {
        self.defines
            .iter()
            .filter_map(|define| define.split_whitespace().nth(1))
            .filter_map(|name| name.strip_prefix("USE_GYRO_SPI_"))
            .map(str::to_string)
            .collect()
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}
