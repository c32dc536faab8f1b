//! # Converter Configuration
//!
//! Settings that steer resolution and fill in board-plan values the target
//! does not state itself.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [validation]
//! channel_mismatch = "error"
//!
//! [defaults]
//! motor_protocol = "DSHOT600"
//! flash_spi_bus = 3
//! ```
//!
//! Every key is optional; a missing file section falls back to the values
//! below.

// src/config.rs - Converter configuration file
use crate::protocol;
use crate::resolve::{Severity, ValidationPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConverterConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// `"warn"` or `"error"`.
    #[serde(default = "default_channel_mismatch")]
    pub channel_mismatch: Severity,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            channel_mismatch: default_channel_mismatch(),
        }
    }
}

/// Values used when the target has no matching `set` line.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_motor_protocol")]
    pub motor_protocol: String,
    #[serde(default = "default_gyro_spi_bus")]
    pub gyro_spi_bus: u32,
    #[serde(default = "default_flash_spi_bus")]
    pub flash_spi_bus: u32,
    #[serde(default = "default_sdcard_spi_bus")]
    pub sdcard_spi_bus: u32,
    #[serde(default = "default_vbat_scale")]
    pub vbat_scale: String,
    #[serde(default = "default_ibata_scale")]
    pub ibata_scale: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            motor_protocol: default_motor_protocol(),
            gyro_spi_bus: default_gyro_spi_bus(),
            flash_spi_bus: default_flash_spi_bus(),
            sdcard_spi_bus: default_sdcard_spi_bus(),
            vbat_scale: default_vbat_scale(),
            ibata_scale: default_ibata_scale(),
        }
    }
}

impl ConverterConfig {
    pub fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            channel_mismatch: self.validation.channel_mismatch,
        }
    }

    /// Validate bus numbers and the default protocol name.
    pub fn validate(&self) -> Result<(), String> {
        let defaults = &self.defaults;
        for (name, bus) in [
            ("gyro_spi_bus", defaults.gyro_spi_bus),
            ("flash_spi_bus", defaults.flash_spi_bus),
            ("sdcard_spi_bus", defaults.sdcard_spi_bus),
        ] {
            if bus == 0 {
                return Err(format!("defaults.{} must be >= 1", name));
            }
        }
        if !protocol::is_known(&defaults.motor_protocol) {
            return Err(format!(
                "defaults.motor_protocol '{}' is not a known protocol",
                defaults.motor_protocol
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_channel_mismatch() -> Severity { Severity::Warning }
fn default_motor_protocol() -> String { "ONESHOT125".to_string() }
fn default_gyro_spi_bus() -> u32 { 1 }
fn default_flash_spi_bus() -> u32 { 2 }
fn default_sdcard_spi_bus() -> u32 { 3 }
fn default_vbat_scale() -> String { "110".to_string() }
fn default_ibata_scale() -> String { "170".to_string() }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConverterConfig, ConfigError> {
    let path = path.as_ref();
    let config: ConverterConfig = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate().map_err(|e| {
        tracing::error!("Rejected config '{}': {}", path.display(), e);
        ConfigError::Invalid(e)
    })?;
    Ok(config)
}
