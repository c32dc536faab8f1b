// src/resolve/mod.rs - Cross-validation of a target against a pin map
//
// Every logical group (motor, servo, SPI/I2C bus, serial port) either comes
// out as a capability-verified assignment or is dropped with an issue.
// Resolution never fails as a whole; acceptance is "no errors logged".
pub mod assignments;
pub mod banks;
pub mod issues;

pub use assignments::{ValidatedChannel, ValidatedI2cBus, ValidatedSpiBus, ValidatedUart};
pub use banks::{TimerBanks, group_by_timer};
pub use issues::{IssueCategory, IssueKind, IssueLog, Severity, ValidationIssue};

use crate::bus::{BusKind, Signal};
use crate::pinmap::PinMap;
use crate::pins::{LogicalPin, RoutedPin};
use crate::target::{ResourcePin, TargetConfig};
use serde::Serialize;

/// How strictly advisory disagreements are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Severity of an annotation channel that disagrees with the table.
    pub channel_mismatch: Severity,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            channel_mismatch: Severity::Warning,
        }
    }
}

/// Everything that resolved, plus the issues found on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBoard {
    pub motors: Vec<ValidatedChannel>,
    pub servos: Vec<ValidatedChannel>,
    pub spi: Vec<ValidatedSpiBus>,
    pub i2c: Vec<ValidatedI2cBus>,
    pub uarts: Vec<ValidatedUart>,
    pub motor_banks: TimerBanks,
    pub servo_banks: TimerBanks,
    pub issues: IssueLog,
}

impl ResolvedBoard {
    pub fn is_accepted(&self) -> bool {
        self.issues.is_accepted()
    }

    pub fn spi_bus(&self, index: u32) -> Option<&ValidatedSpiBus> {
        self.spi.iter().find(|b| b.index == index)
    }
}

/// Output kind sharing the timer validation path.
#[derive(Debug, Clone, Copy)]
enum Output {
    Motor,
    Servo,
}

impl Output {
    fn resource(self) -> &'static str {
        match self {
            Output::Motor => "MOTOR",
            Output::Servo => "SERVO",
        }
    }

    /// Identifier of one output in issue records, `MOTOR_3`.
    fn resource_id(self, index: u32) -> String {
        format!("{}_{}", self.resource(), index)
    }

    fn label(self, index: u32) -> String {
        match self {
            Output::Motor => format!("Motor {}", index),
            Output::Servo => format!("Servo {}", index),
        }
    }
}

pub struct Resolver<'a> {
    config: &'a TargetConfig,
    pinmap: &'a PinMap,
    policy: ValidationPolicy,
    issues: IssueLog,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a TargetConfig, pinmap: &'a PinMap) -> Self {
        Self {
            config,
            pinmap,
            policy: ValidationPolicy::default(),
            issues: IssueLog::new(),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    pub fn summary(&self) -> String {
        self.issues.to_string()
    }

    pub fn validate_motors(&mut self) -> Vec<ValidatedChannel> {
        let config = self.config;
        config
            .motors()
            .iter()
            .filter_map(|motor| self.validate_output(Output::Motor, motor))
            .collect()
    }

    pub fn validate_servos(&mut self) -> Vec<ValidatedChannel> {
        let config = self.config;
        config
            .servos()
            .iter()
            .filter_map(|servo| self.validate_output(Output::Servo, servo))
            .collect()
    }

    fn validate_output(&mut self, output: Output, resource: &ResourcePin) -> Option<ValidatedChannel> {
        let label = output.label(resource.index);
        let issue_pin = Some(resource.pin.to_string());
        let resource_id = output.resource_id(resource.index);

        let Some(assignment) = self.config.timer(resource.pin) else {
            self.issues.error(
                IssueKind::NoTimerAssignment {
                    label,
                    pin: resource.pin,
                },
                &resource_id,
                issue_pin,
            );
            return None;
        };
        let Some(timer) = assignment.timer.as_deref() else {
            self.issues.error(
                IssueKind::MissingTimerIdentity {
                    label,
                    pin: resource.pin,
                },
                &resource_id,
                issue_pin,
            );
            return None;
        };
        let Some(af) = assignment.af else {
            self.issues.error(
                IssueKind::MissingAlternateFunction {
                    label,
                    pin: resource.pin,
                },
                &resource_id,
                issue_pin,
            );
            return None;
        };

        let physical = resource.pin.to_physical();
        let capability = match self.pinmap.timer_candidates(physical, timer, af).as_slice() {
            [] => {
                self.issues.error(
                    IssueKind::TimerNotSupported {
                        label,
                        pin: physical,
                        timer: timer.to_string(),
                        af,
                    },
                    &resource_id,
                    issue_pin,
                );
                return None;
            }
            [single] => (*single).clone(),
            several => {
                self.issues.error(
                    IssueKind::AmbiguousCapability {
                        label,
                        pin: physical,
                        candidates: several
                            .iter()
                            .map(|t| format!("{} {} CH{}", t.pin, t.timer, t.channel))
                            .collect(),
                    },
                    &resource_id,
                    issue_pin,
                );
                return None;
            }
        };

        if let Some(expected) = assignment.channel {
            if expected != capability.channel {
                let severity = self.policy.channel_mismatch;
                self.issues.record(
                    severity,
                    IssueKind::ChannelMismatch {
                        label: label.clone(),
                        expected,
                        found: capability.channel,
                    },
                    &resource_id,
                    issue_pin,
                );
                if severity == Severity::Error {
                    return None;
                }
            }
        }

        tracing::debug!(
            "{}: {} -> {} {} CH{} (AF{})",
            label,
            resource.pin,
            capability.pin,
            capability.timer,
            capability.channel,
            capability.af
        );
        Some(ValidatedChannel {
            index: resource.index,
            logical: resource.pin,
            pin: capability.pin,
            timer: capability.timer,
            channel: capability.channel,
            af: capability.af,
            complementary: capability.complementary,
        })
    }

    pub fn validate_spi_buses(&mut self) -> Vec<ValidatedSpiBus> {
        let indices = self.config.bus_indices(BusKind::Spi);
        indices
            .into_iter()
            .filter_map(|index| {
                let (name, pins) = self.validate_bus(BusKind::Spi, index)?;
                let [mosi, miso, sclk] = <[RoutedPin; 3]>::try_from(pins).ok()?;
                Some(ValidatedSpiBus {
                    index,
                    name,
                    mosi,
                    miso,
                    sclk,
                })
            })
            .collect()
    }

    pub fn validate_i2c_buses(&mut self) -> Vec<ValidatedI2cBus> {
        let indices = self.config.bus_indices(BusKind::I2c);
        indices
            .into_iter()
            .filter_map(|index| {
                let (name, pins) = self.validate_bus(BusKind::I2c, index)?;
                let [scl, sda] = <[RoutedPin; 2]>::try_from(pins).ok()?;
                Some(ValidatedI2cBus {
                    index,
                    name,
                    scl,
                    sda,
                })
            })
            .collect()
    }

    pub fn validate_uarts(&mut self) -> Vec<ValidatedUart> {
        let indices = self.config.bus_indices(BusKind::Uart);
        indices
            .into_iter()
            .filter_map(|index| {
                let (name, pins) = self.validate_bus(BusKind::Uart, index)?;
                let [tx, rx] = <[RoutedPin; 2]>::try_from(pins).ok()?;
                Some(ValidatedUart {
                    index,
                    name,
                    tx,
                    rx,
                })
            })
            .collect()
    }

    /// Routes every signal of bus `index` to the instance the index names.
    /// Returns the instance name and the routed pins in signal order.
    fn validate_bus(&mut self, kind: BusKind, index: u32) -> Option<(String, Vec<RoutedPin>)> {
        let bus_id = format!("{}{}", kind.label(), index);
        let Some(group) = self.config.bus_pins(kind, index) else {
            if kind == BusKind::Uart {
                self.issues
                    .warning(IssueKind::IncompleteUart { index }, &bus_id, None);
            } else {
                self.issues
                    .error(IssueKind::IncompleteBus { kind, index }, &bus_id, None);
            }
            return None;
        };

        let target = self.target_instance(kind, index, &group.pins);
        let mut routed = Vec::with_capacity(group.pins.len());
        let mut complete = true;

        for (signal, logical) in &group.pins {
            let physical = logical.to_physical();
            match self.pinmap.find_route(physical, *signal, &target) {
                Ok(Some(capability)) => routed.push(capability.pin.clone()),
                Ok(None) => {
                    let reachable = self
                        .pinmap
                        .reachable(physical, *signal)
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                    self.issues.error(
                        IssueKind::SignalNotRouted {
                            target: target.clone(),
                            signal: *signal,
                            pin: physical,
                            reachable,
                        },
                        &bus_id,
                        Some(logical.to_string()),
                    );
                    complete = false;
                }
                Err(conflict) => {
                    self.issues.error(
                        IssueKind::AmbiguousCapability {
                            label: format!("{} {}", target, signal),
                            pin: physical,
                            candidates: conflict.routes,
                        },
                        &bus_id,
                        Some(logical.to_string()),
                    );
                    complete = false;
                }
            }
        }

        if !complete {
            return None;
        }
        tracing::debug!(
            "{} resolved: {}",
            target,
            group
                .pins
                .iter()
                .zip(&routed)
                .map(|((signal, _), pin)| format!("{} {}", signal, pin))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Some((target, routed))
    }

    /// Instance name for a bus index. UART ports may be `USARTn` or
    /// `UARTn`; the one any of the group's pins can reach wins.
    fn target_instance(&self, kind: BusKind, index: u32, pins: &[(Signal, LogicalPin)]) -> String {
        let names = kind.target_names(index);
        names
            .iter()
            .find(|name| {
                pins.iter().any(|(signal, pin)| {
                    self.pinmap
                        .routes(pin.to_physical(), *signal)
                        .any(|b| &b.peripheral == *name)
                })
            })
            .or_else(|| names.first())
            .cloned()
            .unwrap_or_else(|| format!("{}{}", kind.label(), index))
    }

    /// Clears the log, runs every group kind, and reports acceptance.
    pub fn validate_all(&mut self) -> bool {
        self.issues.clear();
        self.validate_motors();
        self.validate_servos();
        self.validate_spi_buses();
        self.validate_i2c_buses();
        self.validate_uarts();
        self.issues.is_accepted()
    }

    /// Runs every group kind once and hands back the validated model.
    pub fn resolve(mut self) -> ResolvedBoard {
        self.issues.clear();
        let motors = self.validate_motors();
        let servos = self.validate_servos();
        let spi = self.validate_spi_buses();
        let i2c = self.validate_i2c_buses();
        let uarts = self.validate_uarts();

        tracing::info!(
            "Resolved {} motors, {} servos, {} SPI, {} I2C, {} UART ({} errors, {} warnings)",
            motors.len(),
            servos.len(),
            spi.len(),
            i2c.len(),
            uarts.len(),
            self.issues.error_count(),
            self.issues.warning_count()
        );

        ResolvedBoard {
            motor_banks: group_by_timer(&motors),
            servo_banks: group_by_timer(&servos),
            motors,
            servos,
            spi,
            i2c,
            uarts,
            issues: self.issues,
        }
    }
}
