//! Bus kinds and their per-signal names in both source formats.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BusKind {
    Spi,
    I2c,
    Uart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Signal {
    Mosi,
    Miso,
    Sclk,
    Scl,
    Sda,
    Tx,
    Rx,
}

impl BusKind {
    pub const ALL: [BusKind; 3] = [BusKind::Spi, BusKind::I2c, BusKind::Uart];

    /// Signals a complete group of this kind needs, in emission order.
    pub fn signals(self) -> &'static [Signal] {
        match self {
            BusKind::Spi => &[Signal::Mosi, Signal::Miso, Signal::Sclk],
            BusKind::I2c => &[Signal::Scl, Signal::Sda],
            BusKind::Uart => &[Signal::Tx, Signal::Rx],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BusKind::Spi => "SPI",
            BusKind::I2c => "I2C",
            BusKind::Uart => "UART",
        }
    }

    /// Peripheral instance names a logical bus index refers to.
    ///
    /// UART ports number across both USART and UART instances, so index 4
    /// accepts `USART4` or `UART4`. Low-power UARTs are never implied.
    pub fn target_names(self, index: u32) -> Vec<String> {
        match self {
            BusKind::Spi => vec![format!("SPI{}", index)],
            BusKind::I2c => vec![format!("I2C{}", index)],
            BusKind::Uart => vec![format!("USART{}", index), format!("UART{}", index)],
        }
    }

    /// Whether `peripheral` is the instance selected by `index`.
    pub fn is_target(self, peripheral: &str, index: u32) -> bool {
        self.target_names(index).iter().any(|name| name == peripheral)
    }
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Signal {
    pub fn kind(self) -> BusKind {
        match self {
            Signal::Mosi | Signal::Miso | Signal::Sclk => BusKind::Spi,
            Signal::Scl | Signal::Sda => BusKind::I2c,
            Signal::Tx | Signal::Rx => BusKind::Uart,
        }
    }

    /// Resource type tag used by `resource` lines in a target config.
    pub fn resource_type(self) -> &'static str {
        match self {
            Signal::Mosi => "SPI_MOSI",
            Signal::Miso => "SPI_MISO",
            Signal::Sclk => "SPI_SCK",
            Signal::Scl => "I2C_SCL",
            Signal::Sda => "I2C_SDA",
            Signal::Tx => "SERIAL_TX",
            Signal::Rx => "SERIAL_RX",
        }
    }

    /// Array name of this signal's section in the capability listing.
    pub fn section(self) -> &'static str {
        match self {
            Signal::Mosi => "PinMap_SPI_MOSI",
            Signal::Miso => "PinMap_SPI_MISO",
            Signal::Sclk => "PinMap_SPI_SCLK",
            Signal::Scl => "PinMap_I2C_SCL",
            Signal::Sda => "PinMap_I2C_SDA",
            Signal::Tx => "PinMap_UART_TX",
            Signal::Rx => "PinMap_UART_RX",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::Mosi => "MOSI",
            Signal::Miso => "MISO",
            Signal::Sclk => "SCLK",
            Signal::Scl => "SCL",
            Signal::Sda => "SDA",
            Signal::Tx => "TX",
            Signal::Rx => "RX",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
