pub mod easing;
pub mod orbit;
pub mod pointer_follow;

pub use easing::{Ease, Tween};
pub use orbit::{OrbitControls, OrbitSettings};
pub use pointer_follow::{PointerFollow, PointerFollowSettings};

use crate::camera::PerspectiveCamera;
use crate::scene::SceneState;
use crate::viewport::Viewport;

/// Pointer input in logical pixels, already filtered by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer position relative to the surface's top-left corner
    PointerMoved { x: f32, y: f32 },
    /// Movement while the primary button is held
    PointerDragged { dx: f32, dy: f32 },
    /// Wheel notches, positive away from the user
    Wheel { notches: f32 },
}

/// Active input policy
#[derive(Debug, Clone, Default)]
pub enum Interaction {
    #[default]
    None,
    Orbit(OrbitControls),
    PointerFollow(PointerFollow),
}

impl Interaction {
    /// Feed one input event. `now` is the frame clock's elapsed time.
    pub fn handle(&mut self, event: &InputEvent, now: f32, viewport: &Viewport, scene: &SceneState) {
        match (self, *event) {
            (Interaction::Orbit(controls), InputEvent::PointerDragged { dx, dy }) => {
                controls.on_drag(dx, dy, viewport.height());
            }
            (Interaction::Orbit(controls), InputEvent::Wheel { notches }) => {
                controls.on_wheel(notches);
            }
            (Interaction::PointerFollow(follow), InputEvent::PointerMoved { x, y }) => {
                follow.on_pointer(x, y, viewport.width(), viewport.height(), now, scene);
            }
            _ => {}
        }
    }

    /// Per-frame step, after time-driven animations
    pub fn update(&mut self, delta: f32, elapsed: f32, camera: &mut PerspectiveCamera, scene: &mut SceneState) {
        match self {
            Interaction::None => {}
            Interaction::Orbit(controls) => {
                controls.update(delta, camera);
            }
            Interaction::PointerFollow(follow) => follow.update(elapsed, scene),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Interaction::None => "none",
            Interaction::Orbit(_) => "orbit",
            Interaction::PointerFollow(_) => "pointer-follow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Entity, Model};

    #[test]
    fn orbit_ignores_hover() {
        let camera = PerspectiveCamera::new(50.0, 1.0, 0.1, 100.0);
        let mut interaction = Interaction::Orbit(OrbitControls::new(OrbitSettings::default(), &camera));
        let viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
        let scene = SceneState::new();

        interaction.handle(&InputEvent::PointerMoved { x: 5.0, y: 5.0 }, 0.0, &viewport, &scene);

        let mut moved = camera.clone();
        interaction.update(0.016, 0.016, &mut moved, &mut SceneState::new());
        assert!((moved.position - camera.position).length() < 1e-5);
    }

    #[test]
    fn pointer_follow_uses_viewport_size() {
        let mut scene = SceneState::new();
        let id = scene.add(Entity::new("m", Model::default()));
        let mut interaction = Interaction::PointerFollow(PointerFollow::new(id, PointerFollowSettings::default()));
        let viewport = Viewport::new(1000.0, 500.0, 1.0, 2.0);

        interaction.handle(&InputEvent::PointerMoved { x: 500.0, y: 250.0 }, 0.0, &viewport, &scene);
        interaction.update(0.0, 10.0, &mut PerspectiveCamera::new(50.0, 1.0, 0.1, 100.0), &mut scene);

        assert_eq!(scene.get(id).unwrap().transform.rotation, glam::Vec3::ZERO);
    }
}
