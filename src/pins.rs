//! Pin notations used across the converter.
//!
//! Three spellings of the same physical pin show up:
//!
//! - the target's logical notation, a port letter and two digits (`B04`)
//! - the canonical physical form, `P` + port + unpadded number (`PB4`)
//! - the capability-table token, which may carry an alternate-route
//!   suffix selecting one of several peripheral routings (`PB_0_ALT1`)
//!
//! ```rust
//! use pinroute_rs::pins::{LogicalPin, RoutedPin};
//! let pin: LogicalPin = "B04".parse().unwrap();
//! assert_eq!(pin.to_physical().to_string(), "PB4");
//! let routed = RoutedPin::from_table_token("PB_0_ALT1").unwrap();
//! assert_eq!(routed.to_string(), "PB0_ALT1");
//! ```

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinError {
    #[error("invalid logical pin '{0}': expected a port letter followed by two digits")]
    InvalidLogical(String),
    #[error("invalid physical pin '{0}'")]
    InvalidPhysical(String),
}

fn is_port_letter(c: char) -> bool {
    c.is_ascii_uppercase() && c <= 'K'
}

/// Pin in the target's 3-character notation (`A08`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPin {
    port: char,
    number: u8,
}

impl LogicalPin {
    pub fn port(&self) -> char {
        self.port
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// Drops the zero padding and adds the `P` marker: `B04` becomes `PB4`.
    pub fn to_physical(&self) -> PhysicalPin {
        PhysicalPin {
            port: self.port,
            number: self.number,
        }
    }
}

impl FromStr for LogicalPin {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PinError::InvalidLogical(s.to_string());
        let mut chars = s.chars();
        let port = chars.next().filter(|c| is_port_letter(*c)).ok_or_else(invalid)?;
        let digits = chars.as_str();
        if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = digits.parse().map_err(|_| invalid())?;
        Ok(Self { port, number })
    }
}

impl fmt::Display for LogicalPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.port, self.number)
    }
}

impl Serialize for LogicalPin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Canonical physical pin name (`PA8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalPin {
    port: char,
    number: u8,
}

impl PhysicalPin {
    pub fn new(port: char, number: u8) -> Result<Self, PinError> {
        if !is_port_letter(port) {
            return Err(PinError::InvalidPhysical(format!("P{}{}", port, number)));
        }
        Ok(Self { port, number })
    }

    pub fn port(&self) -> char {
        self.port
    }

    pub fn number(&self) -> u8 {
        self.number
    }
}

/// Accepts both `PB4` and the underscored table spelling `PB_4`.
impl FromStr for PhysicalPin {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PinError::InvalidPhysical(s.to_string());
        let rest = s.strip_prefix('P').ok_or_else(invalid)?;
        let mut chars = rest.chars();
        let port = chars.next().filter(|c| is_port_letter(*c)).ok_or_else(invalid)?;
        let digits = chars.as_str();
        let digits = digits.strip_prefix('_').unwrap_or(digits);
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = digits.parse().map_err(|_| invalid())?;
        Ok(Self { port, number })
    }
}

impl fmt::Display for PhysicalPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}{}", self.port, self.number)
    }
}

impl Serialize for PhysicalPin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Physical pin plus the alternate-route suffix needed to reach one
/// specific peripheral instance. The primary route has no suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutedPin {
    pin: PhysicalPin,
    route: Option<String>,
}

impl RoutedPin {
    pub fn primary(pin: PhysicalPin) -> Self {
        Self { pin, route: None }
    }

    pub fn with_route(pin: PhysicalPin, route: impl Into<String>) -> Self {
        Self {
            pin,
            route: Some(route.into()),
        }
    }

    /// Splits a capability-table token: `PB_0_ALT1` into base `PB0` and
    /// route `ALT1`, `PA_7` into `PA7` with no route.
    pub fn from_table_token(token: &str) -> Result<Self, PinError> {
        let invalid = || PinError::InvalidPhysical(token.to_string());
        let mut parts = token.splitn(3, '_');
        let port = parts.next().ok_or_else(invalid)?;
        let number = parts.next().ok_or_else(invalid)?;
        let pin: PhysicalPin = format!("{}{}", port, number).parse().map_err(|_| invalid())?;
        match parts.next() {
            None => Ok(Self::primary(pin)),
            Some("") => Err(invalid()),
            Some(route) => Ok(Self::with_route(pin, route)),
        }
    }

    pub fn base(&self) -> PhysicalPin {
        self.pin
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn is_primary(&self) -> bool {
        self.route.is_none()
    }
}

impl fmt::Display for RoutedPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route {
            Some(route) => write!(f, "{}_{}", self.pin, route),
            None => write!(f, "{}", self.pin),
        }
    }
}

impl Serialize for RoutedPin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
