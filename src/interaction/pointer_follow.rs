use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::easing::{Ease, Tween};
use crate::scene::{EntityId, SceneState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerFollowSettings {
    /// Maximum rotation in radians at the surface edge, per axis (doubled edge to edge)
    pub range: f32,
    /// Transition length in seconds
    pub duration: f32,
    pub ease: Ease,
}

impl Default for PointerFollowSettings {
    fn default() -> Self {
        Self {
            range: 0.15 * PI,
            duration: 0.9,
            ease: Ease::Power2Out,
        }
    }
}

/// Tilts one entity toward the pointer with an eased transition
#[derive(Debug, Clone)]
pub struct PointerFollow {
    target: EntityId,
    settings: PointerFollowSettings,
    tween: Option<Tween>,
}

impl PointerFollow {
    pub fn new(target: EntityId, settings: PointerFollowSettings) -> Self {
        let mut settings = settings;
        if !(settings.duration.is_finite() && settings.duration >= 0.0) {
            log::warn!("pointer-follow duration {} invalid, using 0", settings.duration);
            settings.duration = 0.0;
        }
        Self {
            target,
            settings,
            tween: None,
        }
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn settings(&self) -> &PointerFollowSettings {
        &self.settings
    }

    /// Transition in flight, if any
    pub fn transition(&self) -> Option<&Tween> {
        self.tween.as_ref()
    }

    /// Rotation (x, y) the pointer at `(x, y)` over a `width`×`height` surface asks for
    pub fn target_rotation(&self, x: f32, y: f32, width: f32, height: f32) -> Vec2 {
        let n = Vec2::new(x / width - 0.5, y / height - 0.5);
        Vec2::new(n.y * self.settings.range, n.x * self.settings.range)
    }

    /// Schedule a transition toward the pointer, replacing any in flight
    pub fn on_pointer(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        now: f32,
        scene: &SceneState,
    ) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let Some(entity) = scene.get(self.target) else {
            log::trace!("pointer-follow target {} not attached, ignoring move", self.target);
            return;
        };

        let from = match &self.tween {
            Some(tween) => tween.sample(now),
            None => Vec2::new(entity.transform.rotation.x, entity.transform.rotation.y),
        };
        let to = self.target_rotation(x, y, width, height);
        self.tween = Some(Tween::new(from, to, now, self.settings.duration, self.settings.ease));
    }

    /// Write the sampled rotation into the target entity
    pub fn update(&mut self, elapsed: f32, scene: &mut SceneState) {
        let Some(tween) = self.tween else {
            return;
        };
        let Some(entity) = scene.get_mut(self.target) else {
            log::trace!("pointer-follow target {} missing, skipping frame", self.target);
            return;
        };

        let rotation = tween.sample(elapsed);
        entity.transform.rotation.x = rotation.x;
        entity.transform.rotation.y = rotation.y;

        if tween.is_finished(elapsed) {
            self.tween = None;
        }
    }
}
