use glam::{Vec2, Vec3};
use std::cell::Cell;
use std::f32::consts::TAU;
use std::rc::Rc;

use scene_loop::camera::PerspectiveCamera;
use scene_loop::core::{DisplayContext, FrameClock, WindowContext, WindowDimensions};
use scene_loop::frame_loop::{FrameLoop, Spin};
use scene_loop::interaction::{
    InputEvent, Interaction, OrbitControls, OrbitSettings, PointerFollow, PointerFollowSettings,
};
use scene_loop::render::Renderer;
use scene_loop::scene::{Entity, EntityId, Model, SceneState};
use scene_loop::viewport::Viewport;

struct ManualClock(Rc<Cell<f32>>);

impl FrameClock for ManualClock {
    fn elapsed(&mut self) -> f32 {
        self.0.get()
    }

    fn reset(&mut self) {
        self.0.set(0.0);
    }
}

struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _scene: &SceneState, _camera: &PerspectiveCamera) -> anyhow::Result<()> {
        Ok(())
    }

    fn resize(&mut self, _output: DisplayContext) {}
}

struct NullWindow;

impl WindowContext for NullWindow {
    fn dimensions(&self) -> WindowDimensions {
        WindowDimensions::new(800.0, 600.0, 1.0)
    }

    fn request_redraw(&self) {}
}

fn setup(time: &Rc<Cell<f32>>) -> (FrameLoop<ManualClock>, EntityId) {
    let mut scene = SceneState::new();
    let id = scene.add(Entity::new("model", Model::default()));
    let frames = FrameLoop::with_clock(
        ManualClock(time.clone()),
        scene,
        PerspectiveCamera::new(50.0, 800.0 / 600.0, 0.1, 100.0),
        Viewport::new(800.0, 600.0, 1.0, 2.0),
    );
    (frames, id)
}

fn rotation_xy(frames: &FrameLoop<ManualClock>, id: EntityId) -> Vec2 {
    let rotation = frames.scene().get(id).unwrap().transform.rotation;
    Vec2::new(rotation.x, rotation.y)
}

/// Run ticks every 16ms from `from` to `to`
fn run(frames: &mut FrameLoop<ManualClock>, time: &Rc<Cell<f32>>, from: f32, to: f32) {
    let mut t = from;
    while t <= to {
        time.set(t);
        frames.tick(&mut NullRenderer, &NullWindow);
        t += 0.016;
    }
}

#[test]
fn latest_pointer_move_wins() {
    let time = Rc::new(Cell::new(0.0));
    let (mut frames, id) = setup(&time);
    let settings = PointerFollowSettings::default();
    let follow = PointerFollow::new(id, settings);
    let p2_target = follow.target_rotation(100.0, 500.0, 800.0, 600.0);
    frames.set_interaction(Interaction::PointerFollow(follow));

    frames.handle_input(InputEvent::PointerMoved { x: 700.0, y: 100.0 });
    run(&mut frames, &time, 0.0, 0.3);

    // Second move lands well before the first transition settles
    frames.handle_input(InputEvent::PointerMoved { x: 100.0, y: 500.0 });
    let mid = rotation_xy(&frames, id);
    run(&mut frames, &time, 0.32, 0.32 + settings.duration + 0.1);

    let settled = rotation_xy(&frames, id);
    assert!((settled - p2_target).length() < 1e-5);
    assert_ne!(mid, settled);
}

#[test]
fn pointer_follow_is_continuous_across_retargets() {
    let time = Rc::new(Cell::new(0.0));
    let (mut frames, id) = setup(&time);
    frames.set_interaction(Interaction::PointerFollow(PointerFollow::new(
        id,
        PointerFollowSettings::default(),
    )));

    frames.handle_input(InputEvent::PointerMoved { x: 800.0, y: 300.0 });
    run(&mut frames, &time, 0.0, 0.2);
    let before = rotation_xy(&frames, id);

    // Retarget at the same instant: no jump
    frames.handle_input(InputEvent::PointerMoved { x: 0.0, y: 300.0 });
    frames.tick(&mut NullRenderer, &NullWindow);
    assert!((rotation_xy(&frames, id) - before).length() < 1e-6);
}

#[test]
fn pointer_follow_overrides_spin_on_x_and_y_only() {
    let time = Rc::new(Cell::new(0.0));
    let (mut frames, id) = setup(&time);
    frames.animate(id, Spin::new(Vec3::new(0.0, 0.0, 1.0)));
    frames.set_interaction(Interaction::PointerFollow(PointerFollow::new(
        id,
        PointerFollowSettings::default(),
    )));

    frames.handle_input(InputEvent::PointerMoved { x: 400.0, y: 300.0 });
    run(&mut frames, &time, 0.0, 2.0);

    let rotation = frames.scene().get(id).unwrap().transform.rotation;
    assert_eq!(Vec2::new(rotation.x, rotation.y), Vec2::ZERO);
    assert!(rotation.z > 1.9);
}

#[test]
fn orbit_drag_turns_the_camera_around_the_target() {
    let time = Rc::new(Cell::new(0.0));
    let (mut frames, _) = setup(&time);
    frames.camera_mut().position = Vec3::new(0.0, 0.0, 5.0);
    let controls = OrbitControls::new(OrbitSettings::default(), frames.camera());
    frames.set_interaction(Interaction::Orbit(controls));

    // A quarter of the surface height is a quarter turn
    frames.handle_input(InputEvent::PointerDragged { dx: -150.0, dy: 0.0 });
    run(&mut frames, &time, 0.0, 0.0);

    let camera = frames.camera();
    assert!((camera.position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    assert_eq!(camera.target, Vec3::ZERO);
    assert_eq!(frames.interaction().name(), "orbit");
}

#[test]
fn damped_orbit_keeps_moving_after_release() {
    let time = Rc::new(Cell::new(0.0));
    let (mut frames, _) = setup(&time);
    frames.camera_mut().position = Vec3::new(0.0, 0.0, 5.0);
    let settings = OrbitSettings {
        enable_damping: true,
        damping_factor: 0.1,
        ..Default::default()
    };
    let controls = OrbitControls::new(settings, frames.camera());
    frames.set_interaction(Interaction::Orbit(controls));

    frames.handle_input(InputEvent::PointerDragged { dx: -60.0, dy: 0.0 });
    run(&mut frames, &time, 0.0, 0.0);
    let first = frames.camera().position;
    run(&mut frames, &time, 0.016, 0.1);
    let later = frames.camera().position;

    assert!(later.x > first.x);
    assert!((later.length() - 5.0).abs() < 1e-4);

    run(&mut frames, &time, 0.116, 5.0);
    let Interaction::Orbit(controls) = frames.interaction() else {
        panic!("orbit dropped");
    };
    assert!((controls.azimuth() - TAU * 60.0 / 600.0).abs() < 1e-3);
}

#[test]
fn wheel_zooms_in_toward_the_target() {
    let time = Rc::new(Cell::new(0.0));
    let (mut frames, _) = setup(&time);
    frames.camera_mut().position = Vec3::new(0.0, 0.0, 10.0);
    let controls = OrbitControls::new(OrbitSettings::default(), frames.camera());
    frames.set_interaction(Interaction::Orbit(controls));

    frames.handle_input(InputEvent::Wheel { notches: 1.0 });
    run(&mut frames, &time, 0.0, 0.0);

    assert!((frames.camera().position.z - 9.5).abs() < 1e-4);
}
