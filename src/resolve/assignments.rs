// src/resolve/assignments.rs - Capability-verified assignments
use crate::pins::{LogicalPin, RoutedPin};
use serde::Serialize;

/// A motor or servo output bound to a timer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedChannel {
    pub index: u32,
    pub logical: LogicalPin,
    pub pin: RoutedPin,
    pub timer: String,
    /// Channel from the capability table, not the annotation.
    pub channel: u8,
    pub af: u8,
    pub complementary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedSpiBus {
    pub index: u32,
    pub name: String,
    pub mosi: RoutedPin,
    pub miso: RoutedPin,
    pub sclk: RoutedPin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedI2cBus {
    pub index: u32,
    pub name: String,
    pub scl: RoutedPin,
    pub sda: RoutedPin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedUart {
    pub index: u32,
    /// `USART2` or `UART4`, whichever instance the pins reach.
    pub name: String,
    pub tx: RoutedPin,
    pub rx: RoutedPin,
}
