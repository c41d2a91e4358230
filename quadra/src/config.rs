use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunable kernel settings. Missing fields take their defaults when loaded
/// from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Undo depth; oldest entries are evicted beyond this.
    pub history_limit: usize,
    /// Radius (px) used when resolving raw pointer positions to nodes.
    pub snap_radius: f64,
    /// Samples per edge when building block polygons.
    pub block_flatten_samples: usize,
    /// Samples per edge for edge snapping.
    pub snap_flatten_samples: usize,
    /// Inset block boundaries by the average half road width.
    pub inset_blocks: bool,
    pub default_road_width: f64,
    /// Lots smaller than this (m²) are discarded as fragments.
    pub min_lot_area_m2: f64,
    /// Slack (px) when checking lot containment in a block.
    pub containment_tolerance: f64,
    /// Scale used to measure lots drawn in blocks that were never generated.
    pub default_pixels_per_meter: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            history_limit: 50,
            snap_radius: 10.0,
            block_flatten_samples: 16,
            snap_flatten_samples: 32,
            inset_blocks: true,
            default_road_width: 12.0,
            min_lot_area_m2: 0.5,
            containment_tolerance: 1.0,
            default_pixels_per_meter: 1.0,
        }
    }
}

impl KernelConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: KernelConfig = serde_json::from_str(s)?;
        Ok(cfg.sanitized())
    }

    /// Clamp values that would make the kernel misbehave.
    pub fn sanitized(mut self) -> Self {
        self.history_limit = self.history_limit.max(1);
        self.block_flatten_samples = self.block_flatten_samples.clamp(1, 256);
        self.snap_flatten_samples = self.snap_flatten_samples.clamp(1, 256);
        if !self.snap_radius.is_finite() || self.snap_radius < 0.0 {
            self.snap_radius = 10.0;
        }
        if !self.default_road_width.is_finite() || self.default_road_width <= 0.0 {
            self.default_road_width = 12.0;
        }
        if !self.min_lot_area_m2.is_finite() || self.min_lot_area_m2 < 0.0 {
            self.min_lot_area_m2 = 0.5;
        }
        if !self.containment_tolerance.is_finite() || self.containment_tolerance < 0.0 {
            self.containment_tolerance = 1.0;
        }
        if !self.default_pixels_per_meter.is_finite() || self.default_pixels_per_meter <= 0.0 {
            self.default_pixels_per_meter = 1.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = KernelConfig::from_json_str(r#"{ "history_limit": 5 }"#).unwrap();
        assert_eq!(cfg.history_limit, 5);
        assert_eq!(cfg.block_flatten_samples, 16);
        assert!(cfg.inset_blocks);
    }

    #[test]
    fn zero_history_is_clamped() {
        let cfg = KernelConfig::from_json_str(r#"{ "history_limit": 0, "snap_radius": -3 }"#).unwrap();
        assert_eq!(cfg.history_limit, 1);
        assert_eq!(cfg.snap_radius, 10.0);
    }
}
