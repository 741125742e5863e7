//! Reel motion configuration

use serde::{Deserialize, Serialize};

use crate::easing::Easing;

/// Geometry and motion tuning for one reel.
///
/// Positions are measured upward from the reel's center line in the same
/// unit as `cell_pitch` (pixels for most renderers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    /// Rows visible at rest
    pub visible_rows: usize,
    /// Hidden rows on each side of the visible band
    pub buffer_rows: usize,
    /// Distance between two row centers
    pub cell_pitch: f64,
    /// Top spin speed (units/s)
    pub max_speed: f64,
    /// Spin-up acceleration (units/s²)
    pub acceleration: f64,
    /// Duration of the eased stop (s)
    pub stop_duration: f64,
    /// Stop curve
    pub easing: Easing,
    /// Minimum travel before rest, in wrap periods (>= 1)
    pub min_extra_wraps: f64,
    /// Movement that must accumulate before slot positions are recomputed
    pub sync_threshold: f64,
    /// How far a slot may sit from a row center and still occupy it
    pub row_tolerance: f64,
    /// Frame-hitch clamp for a single tick (s)
    pub max_tick_dt: f64,
    /// Longest simulation step inside one tick (s)
    pub max_substep: f64,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            visible_rows: 3,
            buffer_rows: 1,
            cell_pitch: 150.0,
            max_speed: 2400.0,
            acceleration: 8000.0,
            stop_duration: 0.6,
            easing: Easing::EaseOutCubic,
            min_extra_wraps: 1.0,
            sync_threshold: 0.5,
            row_tolerance: 1.0,
            max_tick_dt: 0.1,
            max_substep: 1.0 / 120.0,
        }
    }
}

impl ReelConfig {
    /// Fast profile: shorter stop, harder acceleration
    pub fn turbo() -> Self {
        Self {
            max_speed: 3000.0,
            acceleration: 15000.0,
            stop_duration: 0.35,
            ..Self::default()
        }
    }

    /// Pooled slots per reel
    pub fn slot_count(&self) -> usize {
        self.visible_rows + 2 * self.buffer_rows
    }

    /// Period after which a slot's rendered position wraps
    pub fn wrap_height(&self) -> f64 {
        self.slot_count() as f64 * self.cell_pitch
    }

    /// Slots closer than this to the center line are drawn
    pub fn visible_extent(&self) -> f64 {
        (self.visible_rows as f64 + 1.0) * self.cell_pitch / 2.0
    }

    /// Resting position of visible row `row` (0 = top)
    pub fn row_position(&self, row: usize) -> f64 {
        ((self.visible_rows as f64 - 1.0) / 2.0 - row as f64) * self.cell_pitch
    }

    /// Resting positions of all visible rows, top first
    pub fn row_positions(&self) -> Vec<f64> {
        (0..self.visible_rows).map(|r| self.row_position(r)).collect()
    }

    /// Origin of pooled slot `index` (0 = topmost)
    pub fn slot_origin(&self, index: usize) -> f64 {
        ((self.slot_count() as f64 - 1.0) / 2.0 - index as f64) * self.cell_pitch
    }

    /// Fastest the offset can move during a stop from top speed
    pub fn peak_stop_speed(&self) -> f64 {
        let slope = self.easing.initial_slope();
        let decel = self.max_speed * self.stop_duration / slope;
        let distance = decel.max(self.min_extra_wraps * self.wrap_height()) + self.cell_pitch;
        slope * distance / self.stop_duration
    }

    /// Validate geometry and timing.
    ///
    /// Beyond plain range checks this enforces that no single step (plus the
    /// sync threshold) can carry a wrapping slot past the hidden buffer into
    /// the visible band, so a symbol swap is never on screen.
    pub fn validate(&self) -> Result<(), ReelConfigError> {
        if self.visible_rows == 0 {
            return Err(ReelConfigError::InvalidGeometry("visible_rows must be > 0"));
        }
        if self.buffer_rows == 0 {
            return Err(ReelConfigError::InvalidGeometry("buffer_rows must be > 0"));
        }
        if !self.cell_pitch.is_finite() || self.cell_pitch <= 0.0 {
            return Err(ReelConfigError::InvalidGeometry("cell_pitch must be > 0"));
        }
        let positive = [
            ("max_speed", self.max_speed),
            ("acceleration", self.acceleration),
            ("stop_duration", self.stop_duration),
            ("max_tick_dt", self.max_tick_dt),
            ("max_substep", self.max_substep),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ReelConfigError::InvalidTiming { name, value });
            }
        }
        if !self.min_extra_wraps.is_finite() || self.min_extra_wraps < 1.0 {
            return Err(ReelConfigError::TooFewWraps(self.min_extra_wraps));
        }
        if !self.sync_threshold.is_finite() || self.sync_threshold < 0.0 {
            return Err(ReelConfigError::InvalidTiming {
                name: "sync_threshold",
                value: self.sync_threshold,
            });
        }
        if !self.row_tolerance.is_finite() || self.row_tolerance <= 0.0 {
            return Err(ReelConfigError::InvalidGeometry("row_tolerance must be > 0"));
        }

        let margin = self.wrap_height() / 2.0 - self.visible_extent();
        let step = self.max_speed.max(self.peak_stop_speed()) * self.max_substep;
        if step + self.sync_threshold >= margin {
            return Err(ReelConfigError::StepExceedsBuffer { step, margin });
        }
        Ok(())
    }
}

/// Reel configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReelConfigError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("Invalid timing: {name} = {value}")]
    InvalidTiming { name: &'static str, value: f64 },

    #[error("min_extra_wraps must be >= 1, got {0}")]
    TooFewWraps(f64),

    #[error("One step moves {step:.1} but the hidden buffer is only {margin:.1} deep")]
    StepExceedsBuffer { step: f64, margin: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_geometry() {
        let config = ReelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slot_count(), 5);
        assert_relative_eq!(config.wrap_height(), 750.0);
        assert_relative_eq!(config.visible_extent(), 300.0);
        assert_eq!(config.row_positions(), vec![150.0, 0.0, -150.0]);
        assert_relative_eq!(config.slot_origin(0), 300.0);
        assert_relative_eq!(config.slot_origin(4), -300.0);
    }

    #[test]
    fn test_turbo_is_valid() {
        assert!(ReelConfig::turbo().validate().is_ok());
    }

    #[test]
    fn test_rejects_thin_buffer() {
        let config = ReelConfig {
            max_substep: 0.1,
            ..ReelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReelConfigError::StepExceedsBuffer { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            ReelConfig { visible_rows: 0, ..ReelConfig::default() },
            ReelConfig { buffer_rows: 0, ..ReelConfig::default() },
            ReelConfig { cell_pitch: -1.0, ..ReelConfig::default() },
            ReelConfig { stop_duration: 0.0, ..ReelConfig::default() },
            ReelConfig { max_speed: f64::NAN, ..ReelConfig::default() },
            ReelConfig { min_extra_wraps: 0.5, ..ReelConfig::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReelConfig =
            serde_json::from_str(r#"{ "cell_pitch": 100.0, "min_extra_wraps": 2.0 }"#).unwrap();
        assert_eq!(config.visible_rows, 3);
        assert_relative_eq!(config.wrap_height(), 500.0);
        assert!(config.validate().is_ok());
    }
}
