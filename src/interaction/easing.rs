use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Interpolation curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    /// Quadratic ease-out: fast start, decelerating to rest
    #[default]
    Power2Out,
}

impl Ease {
    /// Map progress `t` in [0, 1] to eased progress in [0, 1]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power2Out => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Time-bounded transition between two values, sampled at absolute times
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: Vec2,
    pub to: Vec2,
    pub start: f32,
    pub duration: f32,
    pub ease: Ease,
}

impl Tween {
    pub fn new(from: Vec2, to: Vec2, start: f32, duration: f32, ease: Ease) -> Self {
        Self {
            from,
            to,
            start,
            duration,
            ease,
        }
    }

    /// Linear progress at time `now`, clamped to [0, 1]
    pub fn progress(&self, now: f32) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now: f32) -> Vec2 {
        self.from.lerp(self.to, self.ease.apply(self.progress(now)))
    }

    pub fn is_finished(&self, now: f32) -> bool {
        self.progress(now) >= 1.0
    }
}
