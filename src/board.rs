// src/board.rs - Emitter-facing board plan
//
// Named blocks built from the resolved model. A block whose prerequisites
// did not resolve is left out; that is never an error.
use crate::config::ConverterConfig;
use crate::pins::{PhysicalPin, RoutedPin};
use crate::protocol::{self, ProtocolTiming, SERVO_TIMING};
use crate::resolve::{ResolvedBoard, TimerBanks, ValidatedSpiBus};
use crate::target::TargetConfig;
use serde::Serialize;

const SPI_CLOCK_HZ: u32 = 8_000_000;
const I2C_CLOCK_HZ: u32 = 400_000;
const UART_BAUD: u32 = 115_200;
const MAX_STATUS_LEDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// SPI NOR flash, used as a LittleFS volume.
    SpiFlash,
    SdCard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageBlock {
    pub backend: StorageBackend,
    pub bus: String,
    pub mosi: RoutedPin,
    pub miso: RoutedPin,
    pub sclk: RoutedPin,
    pub cs: PhysicalPin,
    pub clock_hz: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImuBlock {
    pub chips: Vec<String>,
    pub bus: String,
    pub mosi: RoutedPin,
    pub miso: RoutedPin,
    pub sclk: RoutedPin,
    pub cs: PhysicalPin,
    pub interrupt: Option<PhysicalPin>,
    pub clock_hz: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct I2cBlock {
    pub name: String,
    pub usage: String,
    pub scl: RoutedPin,
    pub sda: RoutedPin,
    pub clock_hz: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UartBlock {
    pub index: u32,
    pub name: String,
    pub tx: RoutedPin,
    pub rx: RoutedPin,
    pub baud: u32,
}

/// Battery monitor inputs. Scale factors pass through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryBlock {
    pub voltage_pin: Option<PhysicalPin>,
    pub current_pin: Option<PhysicalPin>,
    pub vbat_scale: String,
    pub ibata_scale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputBlock {
    pub protocol: String,
    pub timing: ProtocolTiming,
    pub banks: TimerBanks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardPlan {
    pub board: Option<String>,
    pub manufacturer: Option<String>,
    pub mcu: Option<String>,
    pub gyro_chips: Vec<String>,
    pub storage: Option<StorageBlock>,
    pub imu: Option<ImuBlock>,
    pub i2c: Vec<I2cBlock>,
    pub uarts: Vec<UartBlock>,
    pub battery: Option<BatteryBlock>,
    pub status_leds: Vec<PhysicalPin>,
    pub servos: Option<OutputBlock>,
    pub motors: Option<OutputBlock>,
}

impl BoardPlan {
    pub fn build(target: &TargetConfig, resolved: &ResolvedBoard, config: &ConverterConfig) -> Self {
        let plan = Self {
            board: target.board_name.clone(),
            manufacturer: target.manufacturer_id.clone(),
            mcu: target.mcu_type.clone(),
            gyro_chips: target.gyro_chips(),
            storage: storage_block(target, resolved, config),
            imu: imu_block(target, resolved, config),
            i2c: i2c_blocks(resolved),
            uarts: resolved
                .uarts
                .iter()
                .map(|uart| UartBlock {
                    index: uart.index,
                    name: uart.name.clone(),
                    tx: uart.tx.clone(),
                    rx: uart.rx.clone(),
                    baud: UART_BAUD,
                })
                .collect(),
            battery: battery_block(target, config),
            status_leds: status_leds(target),
            servos: servo_block(resolved),
            motors: motor_block(target, resolved, config),
        };
        tracing::info!(
            "Planned {}: storage={} imu={} i2c={} uarts={} battery={} leds={} servos={} motors={}",
            plan.board.as_deref().unwrap_or("<unnamed>"),
            plan.storage.is_some(),
            plan.imu.is_some(),
            plan.i2c.len(),
            plan.uarts.len(),
            plan.battery.is_some(),
            plan.status_leds.len(),
            plan.servos.is_some(),
            plan.motors.is_some()
        );
        plan
    }
}

/// Bus number from a `set` line, or the configured default.
fn bus_setting(target: &TargetConfig, key: &str, default: u32) -> u32 {
    match target.setting(key) {
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Setting {} = '{}' is not a bus number, using {}", key, value, default);
            default
        }),
        None => default,
    }
}

fn spi_bus<'r>(resolved: &'r ResolvedBoard, index: u32, user: &str) -> Option<&'r ValidatedSpiBus> {
    let bus = resolved.spi_bus(index);
    if bus.is_none() {
        tracing::warn!("Omitting {}: SPI{} did not resolve", user, index);
    }
    bus
}

fn storage_block(
    target: &TargetConfig,
    resolved: &ResolvedBoard,
    config: &ConverterConfig,
) -> Option<StorageBlock> {
    let flash_cs = target.first_pin("FLASH_CS");
    let sdcard_cs = target.first_pin("SDCARD_CS");
    let blackbox_on_flash = target.setting("blackbox_device") == Some("SPIFLASH");

    let (backend, cs, index) = match (flash_cs, sdcard_cs) {
        (Some(cs), sd) if blackbox_on_flash || sd.is_none() => (
            StorageBackend::SpiFlash,
            cs,
            bus_setting(target, "flash_spi_bus", config.defaults.flash_spi_bus),
        ),
        (_, Some(cs)) => (
            StorageBackend::SdCard,
            cs,
            bus_setting(target, "sdcard_spi_bus", config.defaults.sdcard_spi_bus),
        ),
        _ => return None,
    };

    let bus = spi_bus(resolved, index, "storage")?;
    Some(StorageBlock {
        backend,
        bus: bus.name.clone(),
        mosi: bus.mosi.clone(),
        miso: bus.miso.clone(),
        sclk: bus.sclk.clone(),
        cs: cs.to_physical(),
        clock_hz: SPI_CLOCK_HZ,
    })
}

fn imu_block(target: &TargetConfig, resolved: &ResolvedBoard, config: &ConverterConfig) -> Option<ImuBlock> {
    let cs = target.first_pin("GYRO_CS")?;
    let index = bus_setting(target, "gyro_1_spibus", config.defaults.gyro_spi_bus);
    let bus = spi_bus(resolved, index, "IMU")?;
    Some(ImuBlock {
        chips: target.gyro_chips(),
        bus: bus.name.clone(),
        mosi: bus.mosi.clone(),
        miso: bus.miso.clone(),
        sclk: bus.sclk.clone(),
        cs: cs.to_physical(),
        interrupt: target.first_pin("GYRO_EXTI").map(|pin| pin.to_physical()),
        clock_hz: SPI_CLOCK_HZ,
    })
}

fn i2c_usage(index: u32, bus_count: usize) -> &'static str {
    if bus_count == 1 {
        return "Environmental sensors";
    }
    match index {
        1 => "Airspeed sensor, external compass",
        2 => "Barometer, compass",
        _ => "External sensors",
    }
}

fn i2c_blocks(resolved: &ResolvedBoard) -> Vec<I2cBlock> {
    resolved
        .i2c
        .iter()
        .map(|bus| I2cBlock {
            name: bus.name.clone(),
            usage: i2c_usage(bus.index, resolved.i2c.len()).to_string(),
            scl: bus.scl.clone(),
            sda: bus.sda.clone(),
            clock_hz: I2C_CLOCK_HZ,
        })
        .collect()
}

fn battery_block(target: &TargetConfig, config: &ConverterConfig) -> Option<BatteryBlock> {
    let voltage_pin = target.first_pin("ADC_BATT").map(|pin| pin.to_physical());
    let current_pin = target.first_pin("ADC_CURR").map(|pin| pin.to_physical());
    if voltage_pin.is_none() && current_pin.is_none() {
        return None;
    }
    Some(BatteryBlock {
        voltage_pin,
        current_pin,
        vbat_scale: target
            .setting("vbat_scale")
            .map(str::to_string)
            .unwrap_or_else(|| config.defaults.vbat_scale.clone()),
        ibata_scale: target
            .setting("ibata_scale")
            .map(str::to_string)
            .unwrap_or_else(|| config.defaults.ibata_scale.clone()),
    })
}

fn status_leds(target: &TargetConfig) -> Vec<PhysicalPin> {
    let mut leds: Vec<_> = target.resources_of("LED").iter().collect();
    leds.sort_by_key(|r| r.index);
    leds.into_iter()
        .take(MAX_STATUS_LEDS)
        .map(|r| r.pin.to_physical())
        .collect()
}

fn servo_block(resolved: &ResolvedBoard) -> Option<OutputBlock> {
    if resolved.servos.is_empty() {
        return None;
    }
    Some(OutputBlock {
        protocol: "PWM".to_string(),
        timing: SERVO_TIMING,
        banks: resolved.servo_banks.clone(),
    })
}

fn motor_block(
    target: &TargetConfig,
    resolved: &ResolvedBoard,
    config: &ConverterConfig,
) -> Option<OutputBlock> {
    if resolved.motors.is_empty() {
        if !target.motors().is_empty() {
            tracing::warn!("Omitting motors: no motor output resolved");
        }
        return None;
    }
    let protocol = target
        .setting("motor_pwm_protocol")
        .unwrap_or(config.defaults.motor_protocol.as_str())
        .to_string();
    Some(OutputBlock {
        timing: protocol::protocol_timing(&protocol),
        protocol,
        banks: resolved.motor_banks.clone(),
    })
}
