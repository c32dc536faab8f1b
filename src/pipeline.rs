// src/pipeline.rs - One isolated conversion run
use crate::board::BoardPlan;
use crate::config::ConverterConfig;
use crate::pinmap::{PinMap, PinMapStats};
use crate::resolve::{ResolvedBoard, Resolver};
use crate::target::TargetConfig;

/// Result of converting one target against one pin map.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub target: TargetConfig,
    pub pinmap_stats: PinMapStats,
    pub resolved: ResolvedBoard,
    pub plan: BoardPlan,
}

impl Conversion {
    /// True when resolution logged no errors.
    pub fn is_accepted(&self) -> bool {
        self.resolved.is_accepted()
    }

    pub fn board_name(&self) -> &str {
        self.target.board_name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn summary(&self) -> String {
        self.resolved.issues.to_string()
    }
}

/// Parses both sources, resolves, groups and plans. Owns every model it
/// builds, so runs can execute side by side.
pub fn convert(target_text: &str, pinmap_text: &str, config: &ConverterConfig) -> Conversion {
    let target = TargetConfig::parse(target_text);
    let pinmap = PinMap::parse(pinmap_text);

    if target.mcu_type.is_none() {
        tracing::warn!("Target has no MCU header line");
    }

    let resolved = Resolver::new(&target, &pinmap)
        .with_policy(config.policy())
        .resolve();
    let plan = BoardPlan::build(&target, &resolved, config);

    tracing::info!(
        "Converted {}: {}",
        target.board_name.as_deref().unwrap_or("<unnamed>"),
        if resolved.is_accepted() { "accepted" } else { "rejected" }
    );

    Conversion {
        pinmap_stats: pinmap.stats,
        target,
        resolved,
        plan,
    }
}
