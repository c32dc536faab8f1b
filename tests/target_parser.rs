// Tests for the unified target parser against a real JHEF411 dump

use pinroute_rs::bus::{BusKind, Signal};
use pinroute_rs::pins::LogicalPin;
use pinroute_rs::target::TargetConfig;
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(&path).unwrap()
}

fn jhef411() -> TargetConfig {
    TargetConfig::parse(&fixture("JHEF411.config"))
}

fn pin(s: &str) -> LogicalPin {
    s.parse().unwrap()
}

#[test]
fn test_board_identity() {
    let config = jhef411();
    assert_eq!(config.mcu_type.as_deref(), Some("STM32F411"));
    assert_eq!(config.board_name.as_deref(), Some("JHEF411"));
    assert_eq!(config.manufacturer_id.as_deref(), Some("JHEF"));
}

#[test]
fn test_defines_and_gyro_chips() {
    let config = jhef411();
    assert!(!config.defines.is_empty());
    assert!(config.has_define("USE_GYRO_SPI_ICM42688P"));
    assert!(config.has_define("USE_FLASH_W25Q128FV"));
    assert!(config.has_define("USE_MAX7456"));
    assert!(!config.has_define("USE_BARO"));
    assert_eq!(config.gyro_chips(), vec!["MPU6000", "ICM42688P"]);
}

#[test]
fn test_motor_resources() {
    let config = jhef411();
    let motors = config.motors();
    assert_eq!(motors.len(), 5);
    assert_eq!((motors[0].index, motors[0].pin), (1, pin("A08")));
    assert_eq!((motors[4].index, motors[4].pin), (5, pin("B04")));
    assert!(config.servos().is_empty());
}

#[test]
fn test_bus_groups() {
    let config = jhef411();

    let spi1 = config.spi_pins(1).unwrap();
    assert_eq!(spi1.get(Signal::Mosi), Some(pin("A07")));
    assert_eq!(spi1.get(Signal::Miso), Some(pin("A06")));
    assert_eq!(spi1.get(Signal::Sclk), Some(pin("A05")));

    let spi2 = config.spi_pins(2).unwrap();
    assert_eq!(spi2.get(Signal::Mosi), Some(pin("B15")));
    assert_eq!(spi2.get(Signal::Miso), Some(pin("B14")));
    assert_eq!(spi2.get(Signal::Sclk), Some(pin("B13")));

    let i2c1 = config.i2c_pins(1).unwrap();
    assert_eq!(i2c1.get(Signal::Scl), Some(pin("B08")));
    assert_eq!(i2c1.get(Signal::Sda), Some(pin("B09")));

    let uart1 = config.uart_pins(1).unwrap();
    assert_eq!((uart1.get(Signal::Tx), uart1.get(Signal::Rx)), (Some(pin("B06")), Some(pin("B07"))));
    let uart2 = config.uart_pins(2).unwrap();
    assert_eq!((uart2.get(Signal::Tx), uart2.get(Signal::Rx)), (Some(pin("A02")), Some(pin("A03"))));

    assert!(config.spi_pins(3).is_none());
    assert_eq!(config.bus_indices(BusKind::Spi), vec![1, 2]);
    assert_eq!(config.bus_indices(BusKind::Uart), vec![1, 2]);
}

#[test]
fn test_timer_assignments_merged() {
    let config = jhef411();
    let a08 = config.timer(pin("A08")).unwrap();
    assert_eq!(a08.af, Some(1));
    assert_eq!(a08.timer.as_deref(), Some("TIM1"));
    assert_eq!(a08.channel, Some(1));

    let b04 = config.timer(pin("B04")).unwrap();
    assert_eq!(b04.af, Some(2));
    assert_eq!(b04.timer.as_deref(), Some("TIM3"));
    assert_eq!(b04.channel, Some(1));

    // DMA annotations must not leak into timer records.
    assert_eq!(config.timers.len(), 7);
}

#[test]
fn test_dma_options() {
    let config = jhef411();
    let adc = &config.dma["ADC_1"];
    assert_eq!((adc.stream, adc.channel), (Some(1), Some(0)));
    let b04 = &config.dma["B04"];
    assert_eq!((b04.stream, b04.channel), (Some(0), Some(5)));
}

#[test]
fn test_features_and_settings() {
    let config = jhef411();
    assert!(config.has_feature("OSD"));
    assert!(config.has_feature("RX_SERIAL"));
    assert!(!config.has_feature("GPS"));
    assert_eq!(config.setting("gyro_1_spibus"), Some("1"));
    assert_eq!(config.setting("gyro_1_sensor_align"), Some("CW180"));
    assert_eq!(config.setting("blackbox_device"), Some("SPIFLASH"));
    assert_eq!(config.setting("flash_spi_bus"), Some("2"));
    assert_eq!(config.setting("motor_pwm_protocol"), Some("DSHOT300"));
}

#[test]
fn test_single_resources() {
    let config = jhef411();
    assert_eq!(config.first_pin("FLASH_CS"), Some(pin("B02")));
    assert_eq!(config.first_pin("OSD_CS"), Some(pin("B12")));
    assert_eq!(config.first_pin("GYRO_CS"), Some(pin("A04")));
    assert_eq!(config.first_pin("GYRO_EXTI"), Some(pin("B03")));
    assert_eq!(config.first_pin("LED"), Some(pin("C13")));
    assert_eq!(config.first_pin("LED_STRIP"), Some(pin("A15")));
    assert_eq!(config.first_pin("SDCARD_CS"), None);
}

#[test]
fn test_unknown_lines_counted_not_fatal() {
    let config = jhef411();
    // `#mcu`, section comments, `serial` and `save` are skipped.
    assert!(config.stats.skipped > 0);
    assert!(config.stats.recognized > 80);
}

#[test]
fn test_pin_conversion() {
    assert_eq!(pin("B04").to_physical().to_string(), "PB4");
    assert_eq!(pin("A10").to_physical().to_string(), "PA10");
    assert_eq!(pin("E11").to_physical().to_string(), "PE11");
    assert_eq!(pin("A00").to_physical().to_string(), "PA0");
}
