// src/resolve/issues.rs - Resolution issues and the per-run issue log
use crate::bus::{BusKind, Signal};
use crate::pins::{LogicalPin, PhysicalPin};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[serde(alias = "warn")]
    Warning,
}

/// Broad classes of resolution problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// A required pin, group or annotation is missing entirely.
    StructuralAbsence,
    /// A pin cannot reach the asserted timer, function or instance.
    CapabilityMismatch,
    Advisory,
}

/// What went wrong. The `Display` text is the issue message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IssueKind {
    #[error("{label} pin {pin} has no timer assignment")]
    NoTimerAssignment { label: String, pin: LogicalPin },

    #[error("{label} pin {pin} has no timer annotation, timer identity unknown")]
    MissingTimerIdentity { label: String, pin: LogicalPin },

    #[error("{label} pin {pin} has no timer line, alternate function unknown")]
    MissingAlternateFunction { label: String, pin: LogicalPin },

    #[error("{label}: {pin} does not support {timer} on AF{af}")]
    TimerNotSupported {
        label: String,
        pin: PhysicalPin,
        timer: String,
        af: u8,
    },

    #[error("{label}: Expected CH{expected}, found CH{found}")]
    ChannelMismatch { label: String, expected: u8, found: u8 },

    #[error("{label}: {pin} matches more than one capability record ({})", .candidates.join(", "))]
    AmbiguousCapability {
        label: String,
        pin: PhysicalPin,
        candidates: Vec<String>,
    },

    #[error("{kind}{index} has incomplete pin assignments")]
    IncompleteBus { kind: BusKind, index: u32 },

    #[error("UART{index} has incomplete pin assignments (TX only?)")]
    IncompleteUart { index: u32 },

    #[error("{target}: {signal} pin {pin} cannot reach {target}{}", reach_hint(.reachable))]
    SignalNotRouted {
        target: String,
        signal: Signal,
        pin: PhysicalPin,
        reachable: Vec<String>,
    },
}

fn reach_hint(reachable: &[String]) -> String {
    if reachable.is_empty() {
        String::new()
    } else {
        format!(" (reaches {})", reachable.join(", "))
    }
}

impl IssueKind {
    pub fn category(&self) -> IssueCategory {
        match self {
            IssueKind::NoTimerAssignment { .. }
            | IssueKind::MissingTimerIdentity { .. }
            | IssueKind::MissingAlternateFunction { .. }
            | IssueKind::IncompleteBus { .. }
            | IssueKind::IncompleteUart { .. } => IssueCategory::StructuralAbsence,
            IssueKind::TimerNotSupported { .. }
            | IssueKind::AmbiguousCapability { .. }
            | IssueKind::SignalNotRouted { .. } => IssueCategory::CapabilityMismatch,
            IssueKind::ChannelMismatch { .. } => IssueCategory::Advisory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    #[serde(rename = "detail")]
    pub kind: IssueKind,
    /// Resource the issue is about (`MOTOR_1`, `SPI2`...).
    pub resource: String,
    pub pin: Option<String>,
}

impl ValidationIssue {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn category(&self) -> IssueCategory {
        self.kind.category()
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Issues accumulated during one resolution run, in the order found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IssueLog {
    issues: Vec<ValidationIssue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, kind: IssueKind, resource: &str, pin: Option<String>) {
        tracing::error!("{}", kind);
        self.push(Severity::Error, kind, resource, pin);
    }

    pub fn warning(&mut self, kind: IssueKind, resource: &str, pin: Option<String>) {
        tracing::warn!("{}", kind);
        self.push(Severity::Warning, kind, resource, pin);
    }

    pub fn record(&mut self, severity: Severity, kind: IssueKind, resource: &str, pin: Option<String>) {
        match severity {
            Severity::Error => self.error(kind, resource, pin),
            Severity::Warning => self.warning(kind, resource, pin),
        }
    }

    fn push(&mut self, severity: Severity, kind: IssueKind, resource: &str, pin: Option<String>) {
        self.issues.push(ValidationIssue {
            severity,
            kind,
            resource: resource.to_string(),
            pin,
        });
    }

    pub fn clear(&mut self) {
        self.issues.clear();
    }

    pub fn all(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Acceptance: no errors. Warnings never block.
    pub fn is_accepted(&self) -> bool {
        self.error_count() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Human-readable validation summary: counts, then each error and warning.
impl fmt::Display for IssueLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation Summary:")?;
        writeln!(f, "  Errors: {}", self.error_count())?;
        write!(f, "  Warnings: {}", self.warning_count())?;
        if self.error_count() > 0 {
            write!(f, "\n\nErrors:")?;
            for issue in self.errors() {
                write!(f, "\n  x {}", issue)?;
            }
        }
        if self.warning_count() > 0 {
            write!(f, "\n\nWarnings:")?;
            for issue in self.warnings() {
                write!(f, "\n  ! {}", issue)?;
            }
        }
        Ok(())
    }
}
