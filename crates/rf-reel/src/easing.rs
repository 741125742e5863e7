//! Easing curves and the stop interpolation driver

use serde::{Deserialize, Serialize};

/// Normalized easing curve, `f(0) = 0`, `f(1) = 1`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseOutQuad,
    #[default]
    EaseOutCubic,
    EaseOutQuart,
}

impl Easing {
    /// Curve value at normalized time `t` (clamped to `[0, 1]`)
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let inv = 1.0 - t;
        match self {
            Easing::Linear => t,
            Easing::EaseOutQuad => 1.0 - inv * inv,
            Easing::EaseOutCubic => 1.0 - inv * inv * inv,
            Easing::EaseOutQuart => 1.0 - inv * inv * inv * inv,
        }
    }

    /// Derivative at `t = 0`; a stop covering distance `d` over `T` seconds
    /// starts at speed `initial_slope() * d / T`.
    pub fn initial_slope(self) -> f64 {
        match self {
            Easing::Linear => 1.0,
            Easing::EaseOutQuad => 2.0,
            Easing::EaseOutCubic => 3.0,
            Easing::EaseOutQuart => 4.0,
        }
    }
}

/// Drives a value from `from` to `to` over a fixed duration.
///
/// This is the only source of offset changes while a reel is stopping.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTween {
    from: f64,
    to: f64,
    duration: f64,
    elapsed: f64,
    easing: Easing,
}

impl StopTween {
    pub fn new(from: f64, to: f64, duration: f64, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
            easing,
        }
    }

    /// Step the interpolation and return the new value
    pub fn advance_stop(&mut self, dt: f64) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed = (self.elapsed + dt).min(self.duration);
        }
        self.value()
    }

    pub fn value(&self) -> f64 {
        if self.is_finished() {
            return self.to;
        }
        let t = self.elapsed / self.duration;
        self.from + (self.to - self.from) * self.easing.apply(t)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}
