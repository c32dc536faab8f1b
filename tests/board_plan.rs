// End-to-end conversion of JHEF411 against the F411 capability listing

use pinroute_rs::board::StorageBackend;
use pinroute_rs::config::{ConverterConfig, load_config};
use pinroute_rs::convert;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(&path).unwrap()
}

fn convert_jhef411(config: &ConverterConfig) -> pinroute_rs::Conversion {
    convert(
        &fixture("JHEF411.config"),
        &fixture("F411_PeripheralPins.c"),
        config,
    )
}

#[test]
fn test_conversion_accepted() {
    let conversion = convert_jhef411(&ConverterConfig::default());
    assert!(conversion.is_accepted());
    assert_eq!(conversion.board_name(), "JHEF411");
    assert!(conversion.summary().starts_with("Validation Summary:\n  Errors: 0\n  Warnings: 0"));
    assert_eq!(conversion.pinmap_stats.timer_entries, 36);
}

#[test]
fn test_plan_identity() {
    let plan = convert_jhef411(&ConverterConfig::default()).plan;
    assert_eq!(plan.board.as_deref(), Some("JHEF411"));
    assert_eq!(plan.manufacturer.as_deref(), Some("JHEF"));
    assert_eq!(plan.mcu.as_deref(), Some("STM32F411"));
    assert_eq!(plan.gyro_chips, vec!["MPU6000", "ICM42688P"]);
}

#[test]
fn test_storage_on_flash_bus() {
    let plan = convert_jhef411(&ConverterConfig::default()).plan;
    let storage = plan.storage.unwrap();
    assert_eq!(storage.backend, StorageBackend::SpiFlash);
    assert_eq!(storage.bus, "SPI2");
    assert_eq!(storage.mosi.to_string(), "PB15");
    assert_eq!(storage.miso.to_string(), "PB14");
    assert_eq!(storage.sclk.to_string(), "PB13");
    assert_eq!(storage.cs.to_string(), "PB2");
    assert_eq!(storage.clock_hz, 8_000_000);
}

#[test]
fn test_imu_block() {
    let plan = convert_jhef411(&ConverterConfig::default()).plan;
    let imu = plan.imu.unwrap();
    assert_eq!(imu.bus, "SPI1");
    assert_eq!(imu.sclk.to_string(), "PA5");
    assert_eq!(imu.cs.to_string(), "PA4");
    assert_eq!(imu.interrupt.map(|p| p.to_string()).as_deref(), Some("PB3"));
    assert_eq!(imu.chips, vec!["MPU6000", "ICM42688P"]);
}

#[test]
fn test_i2c_and_uart_blocks() {
    let plan = convert_jhef411(&ConverterConfig::default()).plan;

    assert_eq!(plan.i2c.len(), 1);
    let i2c = &plan.i2c[0];
    assert_eq!(i2c.name, "I2C1");
    assert_eq!(i2c.usage, "Environmental sensors");
    assert_eq!(i2c.scl.to_string(), "PB8");
    assert_eq!(i2c.sda.to_string(), "PB9");
    assert_eq!(i2c.clock_hz, 400_000);

    let uarts: Vec<String> = plan
        .uarts
        .iter()
        .map(|u| format!("{} {} {}", u.name, u.tx, u.rx))
        .collect();
    assert_eq!(uarts, vec!["USART1 PB6 PB7", "USART2 PA2 PA3"]);
    assert!(plan.uarts.iter().all(|u| u.baud == 115_200));
}

#[test]
fn test_battery_and_leds() {
    let plan = convert_jhef411(&ConverterConfig::default()).plan;
    let battery = plan.battery.unwrap();
    assert_eq!(battery.voltage_pin.map(|p| p.to_string()).as_deref(), Some("PA0"));
    assert_eq!(battery.current_pin.map(|p| p.to_string()).as_deref(), Some("PA1"));
    // vbat_scale is not set by the target, ibata_scale is.
    assert_eq!(battery.vbat_scale, "110");
    assert_eq!(battery.ibata_scale, "170");

    let leds: Vec<String> = plan.status_leds.iter().map(ToString::to_string).collect();
    assert_eq!(leds, vec!["PC13"]);
}

#[test]
fn test_motor_block() {
    let plan = convert_jhef411(&ConverterConfig::default()).plan;
    assert!(plan.servos.is_none());

    let motors = plan.motors.unwrap();
    assert_eq!(motors.protocol, "DSHOT300");
    assert_eq!(
        (motors.timing.frequency_hz, motors.timing.min_pulse_us, motors.timing.max_pulse_us),
        (1000, 0, 0)
    );
    assert!(motors.timing.is_digital());

    let tim3 = &motors.banks["TIM3"];
    assert_eq!(tim3[0].pin.to_string(), "PB0_ALT1");
    assert_eq!(tim3[0].channel, 3);
    assert_eq!(tim3[1].pin.to_string(), "PB4");
    assert_eq!(tim3[1].channel, 1);
    assert_eq!(motors.banks["TIM1"].len(), 3);
}

#[test]
fn test_plan_serializes() {
    let conversion = convert_jhef411(&ConverterConfig::default());
    let value = serde_json::to_value(&conversion.plan).unwrap();
    assert_eq!(value["board"], "JHEF411");
    assert_eq!(value["storage"]["backend"], "spi_flash");
    assert_eq!(value["motors"]["banks"]["TIM3"][0]["pin"], "PB0_ALT1");
    assert_eq!(value["uarts"][1]["name"], "USART2");

    let issues = serde_json::to_value(&conversion.resolved.issues).unwrap();
    assert_eq!(issues, serde_json::json!([]));
}

#[test]
fn test_configured_defaults_apply() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[defaults]\nvbat_scale = \"105\"\nmotor_protocol = \"DSHOT600\"\n\n[validation]\nchannel_mismatch = \"error\""
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let plan = convert_jhef411(&config).plan;
    assert_eq!(plan.battery.unwrap().vbat_scale, "105");
    // The target's own protocol setting still wins.
    assert_eq!(plan.motors.unwrap().protocol, "DSHOT300");
}

#[test]
fn test_motor_fallback_protocol() {
    let target = fixture("JHEF411.config").replace("set motor_pwm_protocol = DSHOT300\n", "");
    let conversion = convert(
        &target,
        &fixture("F411_PeripheralPins.c"),
        &ConverterConfig::default(),
    );
    let motors = conversion.plan.motors.unwrap();
    assert_eq!(motors.protocol, ConverterConfig::default().defaults.motor_protocol);
}

#[test]
fn test_unresolved_bus_omits_dependent_block() {
    // Move flash SCLK to a pin that cannot reach SPI2.
    let target = fixture("JHEF411.config").replace("resource SPI_SCK 2 B13", "resource SPI_SCK 2 B03");
    let conversion = convert(
        &target,
        &fixture("F411_PeripheralPins.c"),
        &ConverterConfig::default(),
    );
    assert!(!conversion.is_accepted());
    assert_eq!(conversion.resolved.issues.error_count(), 1);
    assert!(conversion.plan.storage.is_none());
    assert!(conversion.plan.imu.is_some());
}
