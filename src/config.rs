//! Tracer configuration: algorithm variant selection and tunable thresholds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which back-tracking algorithm to run. The two variants share the stepping
/// core (`StepIntegrator`, `RadiusEstimator`, `Eraser`, `TreeBuilder`) and
/// differ only in their stopping/erase/match policy — see [`Variant`]'s
/// associated constants and `tracer::BranchTracer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Gap-counter based variant (kept for algorithmic comparison).
    Rivulet1,
    /// Online-confidence based variant; the default, more accurate pipeline.
    Rivulet2,
}

/// Tunable parameters for a trace run. Defaults match the documented
/// defaults of the original tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Which algorithm variant to run.
    pub variant: Variant,
    /// Fraction of foreground voxels that must be covered before the trace
    /// loop stops. Must lie in `(0.0, 1.0]`.
    pub coverage: f64,
    /// Minimum branch length (in nodes) for the commit/prune thresholds.
    /// Must be nonzero.
    pub min_length: u32,
    /// Rivulet-1 only: maximum consecutive background steps before a branch
    /// is abandoned.
    pub gap: u32,
    /// Rivulet-1 only: multiplicative slack on the match distance-vs-radius
    /// test used to decide branch-to-tree attachment.
    pub wiring: f64,
    /// Multiplier applied to a branch point's estimated radius when building
    /// the erase tube (Rivulet-2 default `1.1`, Rivulet-1 uses a fixed `0.8`
    /// internally regardless of this field — see `eraser`).
    pub erase_ratio: f64,
    /// Reserved for callers that want to mirror tracing progress into an
    /// external renderer; the core itself never draws anything.
    pub render: bool,
    /// Suppress the per-episode progress log line (error-level diagnostics
    /// are never suppressed).
    pub silence: bool,
    /// Run the leaf-pruning and largest-connected-component steps of
    /// `PostProcess` (default on). Disabling keeps unconnected segments in
    /// the returned tree, matching the original tool's `--no-clean` mode;
    /// reattachment and the soma prepend still run either way.
    pub clean: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Rivulet2,
            coverage: 0.98,
            min_length: 6,
            gap: 8,
            wiring: 1.5,
            erase_ratio: 1.1,
            render: false,
            silence: false,
            clean: true,
        }
    }
}

/// Invalid configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("coverage must be in (0.0, 1.0], got {0}")]
    CoverageOutOfRange(f64),
    #[error("min_length must be nonzero")]
    MinLengthZero,
    #[error("erase_ratio must be positive, got {0}")]
    EraseRatioNotPositive(f64),
    #[error("wiring must be positive, got {0}")]
    WiringNotPositive(f64),
}

impl TraceConfig {
    /// Validate the configuration, returning the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.coverage > 0.0 && self.coverage <= 1.0) {
            return Err(ConfigError::CoverageOutOfRange(self.coverage));
        }
        if self.min_length == 0 {
            return Err(ConfigError::MinLengthZero);
        }
        if !(self.erase_ratio > 0.0) {
            return Err(ConfigError::EraseRatioNotPositive(self.erase_ratio));
        }
        if self.variant == Variant::Rivulet1 && !(self.wiring > 0.0) {
            return Err(ConfigError::WiringNotPositive(self.wiring));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(TraceConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_coverage_is_rejected() {
        let mut c = TraceConfig::default();
        c.coverage = 0.0;
        assert_eq!(c.validate(), Err(ConfigError::CoverageOutOfRange(0.0)));
    }

    #[test]
    fn zero_min_length_is_rejected() {
        let mut c = TraceConfig::default();
        c.min_length = 0;
        assert_eq!(c.validate(), Err(ConfigError::MinLengthZero));
    }

    #[test]
    fn r1_requires_positive_wiring() {
        let mut c = TraceConfig::default();
        c.variant = Variant::Rivulet1;
        c.wiring = 0.0;
        assert_eq!(c.validate(), Err(ConfigError::WiringNotPositive(0.0)));
    }

    #[test]
    fn config_round_trips_through_json() {
        let c = TraceConfig::default();
        let text = serde_json::to_string(&c).unwrap();
        let back: TraceConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, c);
    }
}
