// src/pinmap/mod.rs - MCU pin capability table
pub mod scanner;

use crate::bus::{BusKind, Signal};
use crate::pins::{PhysicalPin, RoutedPin};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

const TIMER_SECTION: &str = "PinMap_TIM";
const TIMER_DESCRIPTOR: &str = "STM_PIN_DATA_EXT";
const BUS_DESCRIPTOR: &str = "STM_PIN_DATA";

const BUS_SIGNALS: [Signal; 7] = [
    Signal::Mosi,
    Signal::Miso,
    Signal::Sclk,
    Signal::Scl,
    Signal::Sda,
    Signal::Tx,
    Signal::Rx,
];

/// One `PinMap_TIM` entry: a pin route that drives a timer channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimerCapability {
    pub pin: RoutedPin,
    pub timer: String,
    pub af: u8,
    pub channel: u8,
    /// Inverted (`CHxN`) output.
    pub complementary: bool,
}

/// One bus entry: a pin route that carries `signal` for `peripheral`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BusCapability {
    pub pin: RoutedPin,
    pub peripheral: String,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pin} reaches {target} {signal} through more than one route: {}", .routes.join(", "))]
pub struct RouteConflict {
    pub pin: PhysicalPin,
    pub signal: Signal,
    pub target: String,
    pub routes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinMapStats {
    pub timer_entries: usize,
    pub bus_entries: usize,
    pub skipped_entries: usize,
    pub duplicates: usize,
    pub missing_sections: Vec<&'static str>,
}

/// Pin capabilities of one MCU variant.
#[derive(Debug, Clone, Default)]
pub struct PinMap {
    pub timers: Vec<TimerCapability>,
    pub spi: Vec<BusCapability>,
    pub i2c: Vec<BusCapability>,
    pub uart: Vec<BusCapability>,
    pub stats: PinMapStats,
}

impl PinMap {
    /// Parses a `PeripheralPins.c`-style listing. Sections are found by name
    /// independently; a missing one leaves its list empty.
    pub fn parse(contents: &str) -> Self {
        let source = scanner::strip_comments(contents);
        let mut map = PinMap::default();

        map.parse_timers(&source);
        for signal in BUS_SIGNALS {
            map.parse_bus_section(&source, signal);
        }

        tracing::debug!(
            "Parsed pin map ({} timer routes, {} SPI, {} I2C, {} UART, {} skipped)",
            map.timers.len(),
            map.spi.len(),
            map.i2c.len(),
            map.uart.len(),
            map.stats.skipped_entries
        );
        map
    }

    fn parse_timers(&mut self, source: &str) {
        let Some((base, body)) = scanner::section_body(source, TIMER_SECTION) else {
            tracing::debug!("Pin map has no {} section", TIMER_SECTION);
            self.stats.missing_sections.push(TIMER_SECTION);
            return;
        };

        let section = scanner::entries(body, base);
        self.stats.skipped_entries += section.malformed;

        let mut seen = HashSet::new();
        for entry in section.entries {
            let Some(capability) = timer_capability(&entry) else {
                tracing::debug!(
                    "Skipping timer entry at {}..{}: {} {} {}",
                    entry.span.start,
                    entry.span.end,
                    entry.pin,
                    entry.peripheral,
                    entry.descriptor
                );
                self.stats.skipped_entries += 1;
                continue;
            };
            if !seen.insert(capability.clone()) {
                tracing::warn!(
                    "Duplicate timer route {} {} CH{} dropped",
                    capability.pin,
                    capability.timer,
                    capability.channel
                );
                self.stats.duplicates += 1;
                continue;
            }
            self.stats.timer_entries += 1;
            self.timers.push(capability);
        }
    }

    fn parse_bus_section(&mut self, source: &str, signal: Signal) {
        let section = signal.section();
        let Some((base, body)) = scanner::section_body(source, section) else {
            tracing::debug!("Pin map has no {} section", section);
            self.stats.missing_sections.push(section);
            return;
        };

        let found = scanner::entries(body, base);
        let mut skipped = found.malformed;
        let mut parsed = Vec::new();
        for entry in found.entries {
            let Some(capability) = bus_capability(&entry, signal) else {
                tracing::debug!(
                    "Skipping {} entry at {}..{}: {} {}",
                    section,
                    entry.span.start,
                    entry.span.end,
                    entry.pin,
                    entry.peripheral
                );
                skipped += 1;
                continue;
            };
            parsed.push(capability);
        }

        let mut added = 0;
        let mut duplicates = 0;
        let list = self.bus_list_mut(signal.kind());
        for capability in parsed {
            if list.contains(&capability) {
                tracing::warn!(
                    "Duplicate {} route {} {} dropped",
                    signal,
                    capability.pin,
                    capability.peripheral
                );
                duplicates += 1;
                continue;
            }
            list.push(capability);
            added += 1;
        }

        self.stats.skipped_entries += skipped;
        self.stats.duplicates += duplicates;
        self.stats.bus_entries += added;
    }

    fn bus_list_mut(&mut self, kind: BusKind) -> &mut Vec<BusCapability> {
        match kind {
            BusKind::Spi => &mut self.spi,
            BusKind::I2c => &mut self.i2c,
            BusKind::Uart => &mut self.uart,
        }
    }

    /// Bus records of one kind, in listing order.
    pub fn bus(&self, kind: BusKind) -> &[BusCapability] {
        match kind {
            BusKind::Spi => &self.spi,
            BusKind::I2c => &self.i2c,
            BusKind::Uart => &self.uart,
        }
    }

    /// Timer routes of `pin` (any alternate route) matching timer and AF.
    pub fn timer_candidates(&self, pin: PhysicalPin, timer: &str, af: u8) -> Vec<&TimerCapability> {
        self.timers
            .iter()
            .filter(|t| t.pin.base() == pin && t.timer == timer && t.af == af)
            .collect()
    }

    /// Every route that carries `signal` on `pin`, whatever the peripheral.
    pub fn routes(&self, pin: PhysicalPin, signal: Signal) -> impl Iterator<Item = &BusCapability> {
        self.bus(signal.kind())
            .iter()
            .filter(move |b| b.pin.base() == pin && b.signal == signal)
    }

    /// The single route connecting `pin` to `target` for `signal`.
    ///
    /// `Ok(None)` when the pin cannot reach the target at all. Two distinct
    /// routes to the same instance is a conflict rather than a choice.
    pub fn find_route(
        &self,
        pin: PhysicalPin,
        signal: Signal,
        target: &str,
    ) -> Result<Option<&BusCapability>, RouteConflict> {
        let matches: Vec<&BusCapability> = self
            .routes(pin, signal)
            .filter(|b| b.peripheral == target)
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            _ => Err(RouteConflict {
                pin,
                signal,
                target: target.to_string(),
                routes: matches.iter().map(|b| b.pin.to_string()).collect(),
            }),
        }
    }

    /// Whether every `(signal, pin)` pair can reach `target`.
    pub fn validate_bus(&self, pins: &[(Signal, PhysicalPin)], target: &str) -> bool {
        pins.iter()
            .all(|(signal, pin)| self.routes(*pin, *signal).any(|b| b.peripheral == target))
    }

    /// Instances reachable from `pin` for `signal`, deduplicated, in listing order.
    pub fn reachable(&self, pin: PhysicalPin, signal: Signal) -> Vec<&str> {
        let mut found: Vec<&str> = Vec::new();
        for capability in self.routes(pin, signal) {
            if !found.contains(&capability.peripheral.as_str()) {
                found.push(&capability.peripheral);
            }
        }
        found
    }
}

fn timer_capability(entry: &scanner::RawEntry<'_>) -> Option<TimerCapability> {
    let pin = RoutedPin::from_table_token(entry.pin).ok()?;
    let args = scanner::call_args(entry.descriptor, TIMER_DESCRIPTOR)?;
    let [_mode, _pull, function, channel, inverted] = args.as_slice() else {
        return None;
    };
    let af = alternate_function(function)?;
    let channel = channel.parse().ok()?;
    let complementary = match *inverted {
        "0" => false,
        "1" => true,
        _ => return None,
    };
    Some(TimerCapability {
        pin,
        timer: entry.peripheral.to_string(),
        af,
        channel,
        complementary,
    })
}

fn bus_capability(entry: &scanner::RawEntry<'_>, signal: Signal) -> Option<BusCapability> {
    if !entry.descriptor.starts_with(BUS_DESCRIPTOR) {
        return None;
    }
    let pin = RoutedPin::from_table_token(entry.pin).ok()?;
    Some(BusCapability {
        pin,
        peripheral: entry.peripheral.to_string(),
        signal,
    })
}

/// `GPIO_AF2_TIM3` -> 2.
fn alternate_function(token: &str) -> Option<u8> {
    let rest = token.strip_prefix("GPIO_AF")?;
    let end = rest.find('_').unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
WEAK const PinMap PinMap_TIM[] = {
  {PA_7,       TIM1,  STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM1, 1, 1)}, // TIM1_CH1N
  {PA_7_ALT1,  TIM3,  STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 2, 0)}, // TIM3_CH2
  {PB_0,       TIM1,  STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM1, 2, 1)}, // TIM1_CH2N
  {PB_0_ALT1,  TIM3,  STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 3, 0)}, // TIM3_CH3
  {PB_4,       TIM3,  STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 1, 0)}, // TIM3_CH1
  {PB_4,       TIM3,  STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 1, 0)}, // TIM3_CH1
  {PB_5,       TIM3,  STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AFx_TIM3, 2, 0)},
  {NC,         NP,    0}
};

WEAK const PinMap PinMap_SPI_MOSI[] = {
  {PA_7,       SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {PA_10,      SPI5, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF6_SPI5)},
  {PB_5,       SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {PB_5_ALT1,  SPI3, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF6_SPI3)},
  {PB_8,       SPI5, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF6_SPI5)},
  {PB_8_ALT1,  SPI5, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF6_SPI5)},
  {NC,         NP,   0}
};
"#;

    fn pin(s: &str) -> PhysicalPin {
        s.parse().unwrap()
    }

    #[test]
    fn test_timer_section() {
        let map = PinMap::parse(LISTING);
        assert_eq!(map.timers.len(), 5);
        assert_eq!(map.stats.duplicates, 1);
        assert_eq!(map.stats.skipped_entries, 1);
        assert!(map.timers[0].complementary);
        assert_eq!(map.timers[1].pin.to_string(), "PA7_ALT1");
        assert_eq!(map.timers[1].af, 2);
    }

    #[test]
    fn test_timer_candidates_span_routes() {
        let map = PinMap::parse(LISTING);
        let pb0 = map.timer_candidates(pin("PB0"), "TIM3", 2);
        assert_eq!(pb0.len(), 1);
        assert_eq!(pb0[0].pin.to_string(), "PB0_ALT1");
        assert_eq!(pb0[0].channel, 3);
        assert_eq!(map.timer_candidates(pin("PB4"), "TIM3", 2).len(), 1);
        assert!(map.timer_candidates(pin("PB4"), "TIM3", 1).is_empty());
        assert!(map.timer_candidates(pin("PB4"), "TIM2", 2).is_empty());
    }

    #[test]
    fn test_bus_stats_count_duplicates_and_malformed() {
        let map = PinMap::parse(
            r#"
WEAK const PinMap PinMap_I2C_SCL[] = {
  {PB_6,       I2C1, STM_PIN_DATA(STM_MODE_AF_OD, GPIO_NOPULL, GPIO_AF4_I2C1)},
  {PB_6,       I2C1, STM_PIN_DATA(STM_MODE_AF_OD, GPIO_NOPULL, GPIO_AF4_I2C1)},
  {PB_8,       I2C1, 0},
  {PB_10}
  {PB_10,      I2C2, STM_PIN_DATA(STM_MODE_AF_OD, GPIO_NOPULL, GPIO_AF4_I2C2)},
  {NC,         NP,   0}
};
"#,
        );
        assert_eq!(map.i2c.len(), 2);
        assert_eq!(map.stats.bus_entries, 2);
        assert_eq!(map.stats.duplicates, 1);
        // `{PB_8, I2C1, 0}` has no pin data, `{PB_10}` is not a tuple.
        assert_eq!(map.stats.skipped_entries, 2);
    }

    #[test]
    fn test_find_route_selects_by_target() {
        let map = PinMap::parse(LISTING);
        let spi3 = map.find_route(pin("PB5"), Signal::Mosi, "SPI3").unwrap().unwrap();
        assert_eq!(spi3.pin.to_string(), "PB5_ALT1");
        let spi1 = map.find_route(pin("PB5"), Signal::Mosi, "SPI1").unwrap().unwrap();
        assert!(spi1.pin.is_primary());
        assert!(map.find_route(pin("PB5"), Signal::Mosi, "SPI2").unwrap().is_none());
        assert!(map.find_route(pin("PB5"), Signal::Miso, "SPI1").unwrap().is_none());
    }

    #[test]
    fn test_find_route_conflict() {
        let map = PinMap::parse(LISTING);
        let conflict = map.find_route(pin("PB8"), Signal::Mosi, "SPI5").unwrap_err();
        assert_eq!(conflict.routes, vec!["PB8", "PB8_ALT1"]);
    }

    #[test]
    fn test_bus_queries() {
        let map = PinMap::parse(LISTING);
        assert!(map.validate_bus(&[(Signal::Mosi, pin("PA7"))], "SPI1"));
        assert!(!map.validate_bus(&[(Signal::Mosi, pin("PA10"))], "SPI1"));
        assert_eq!(map.reachable(pin("PA10"), Signal::Mosi), vec!["SPI5"]);
        assert_eq!(map.reachable(pin("PB5"), Signal::Mosi), vec!["SPI1", "SPI3"]);
        assert!(map.reachable(pin("PC1"), Signal::Mosi).is_empty());
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let map = PinMap::parse(LISTING);
        assert!(map.i2c.is_empty());
        assert!(map.uart.is_empty());
        assert!(map.stats.missing_sections.contains(&"PinMap_UART_TX"));
        assert!(!map.stats.missing_sections.contains(&"PinMap_TIM"));
    }

    #[test]
    fn test_alternate_function_token() {
        assert_eq!(alternate_function("GPIO_AF1_TIM1"), Some(1));
        assert_eq!(alternate_function("GPIO_AF14_TIM12"), Some(14));
        assert_eq!(alternate_function("GPIO_AFx_TIM3"), None);
    }
}
