use glam::Vec3;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use scene_loop::camera::PerspectiveCamera;
use scene_loop::core::{DisplayContext, FrameClock, WindowContext, WindowDimensions};
use scene_loop::frame_loop::{FrameLoop, Spin};
use scene_loop::interaction::{InputEvent, Interaction, PointerFollow, PointerFollowSettings};
use scene_loop::loaders::{LoadEvent, LoadEventKind, LoadKind, LoadRequest, LoadStatus};
use scene_loop::render::Renderer;
use scene_loop::scene::{Attachment, Entity, Material, Model, SceneState, Transform};
use scene_loop::scenes::common::box_mesh;
use scene_loop::viewport::Viewport;

/// Clock the test advances by hand
struct ManualClock(Rc<Cell<f32>>);

impl FrameClock for ManualClock {
    fn elapsed(&mut self) -> f32 {
        self.0.get()
    }

    fn reset(&mut self) {
        self.0.set(0.0);
    }
}

/// Records what each render call saw
#[derive(Default)]
struct RecordingRenderer {
    frames: Vec<Vec<(String, Vec3)>>,
    fail: bool,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, scene: &SceneState, _camera: &PerspectiveCamera) -> anyhow::Result<()> {
        self.frames.push(
            scene
                .entities()
                .map(|(_, e)| (e.name.clone(), e.transform.rotation))
                .collect(),
        );
        if self.fail {
            anyhow::bail!("device lost");
        }
        Ok(())
    }

    fn resize(&mut self, _output: DisplayContext) {}
}

#[derive(Default)]
struct TestWindow {
    redraws: Cell<usize>,
}

impl WindowContext for TestWindow {
    fn dimensions(&self) -> WindowDimensions {
        WindowDimensions::new(800.0, 600.0, 1.0)
    }

    fn request_redraw(&self) {
        self.redraws.set(self.redraws.get() + 1);
    }
}

fn frame_loop(time: &Rc<Cell<f32>>) -> FrameLoop<ManualClock> {
    let viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
    let camera = PerspectiveCamera::new(75.0, 800.0 / 600.0, 0.1, 1000.0);
    FrameLoop::with_clock(ManualClock(time.clone()), SceneState::new(), camera, viewport)
}

fn cube(name: &str) -> Entity {
    Entity::new(name, Model::single(box_mesh(1.0, 1.0, 1.0), Material::default()))
}

#[test]
fn each_tick_renders_once_and_schedules_the_next() {
    let time = Rc::new(Cell::new(0.0));
    let mut frames = frame_loop(&time);
    let mut renderer = RecordingRenderer::default();
    let window = TestWindow::default();

    for (i, t) in [0.0, 0.25, 0.5].into_iter().enumerate() {
        time.set(t);
        let info = frames.tick(&mut renderer, &window);
        assert_eq!(info.number, i as u64 + 1);
        assert_eq!(info.time, t);
    }

    assert_eq!(renderer.frames.len(), 3);
    assert_eq!(window.redraws.get(), 3);
    assert_eq!(frames.frame().delta, 0.25);
}

#[test]
fn spin_advances_monotonically_with_time() {
    let time = Rc::new(Cell::new(0.0));
    let mut frames = frame_loop(&time);
    let id = frames.scene_mut().add(cube("cube"));
    frames.animate(id, Spin::new(Vec3::new(0.1, 0.1, 0.0)));
    let mut renderer = RecordingRenderer::default();
    let window = TestWindow::default();

    let mut previous = -1.0;
    for t in [0.0, 0.016, 0.5, 1.0, 10.0] {
        time.set(t);
        frames.tick(&mut renderer, &window);
        let rotation = frames.scene().get(id).unwrap().transform.rotation;
        assert!(rotation.y > previous);
        assert!((rotation.x - 0.1 * t).abs() < 1e-6);
        previous = rotation.y;
    }
}

#[test]
fn same_elapsed_time_gives_identical_transforms() {
    let time = Rc::new(Cell::new(2.0));
    let mut frames = frame_loop(&time);
    let id = frames.scene_mut().add(cube("cube"));
    frames.animate(id, Spin::new(Vec3::new(0.3, 0.7, 0.0)));
    let mut renderer = RecordingRenderer::default();
    let window = TestWindow::default();

    frames.tick(&mut renderer, &window);
    let first = frames.scene().get(id).unwrap().transform;
    frames.tick(&mut renderer, &window);
    let second = frames.scene().get(id).unwrap().transform;

    assert_eq!(first, second);
    assert_eq!(renderer.frames[0], renderer.frames[1]);
    assert_eq!(frames.frame().delta, 0.0);
}

#[test]
fn render_failure_does_not_stop_the_loop() {
    let time = Rc::new(Cell::new(0.0));
    let mut frames = frame_loop(&time);
    let mut renderer = RecordingRenderer {
        fail: true,
        ..Default::default()
    };
    let window = TestWindow::default();

    for i in 0..3 {
        time.set(i as f32 * 0.1);
        frames.tick(&mut renderer, &window);
    }
    assert_eq!(renderer.frames.len(), 3);
    assert_eq!(window.redraws.get(), 3);
}

#[test]
fn failed_model_load_keeps_rendering() {
    let time = Rc::new(Cell::new(0.0));
    let mut frames = frame_loop(&time);
    frames.scene_mut().add(cube("cube"));
    let slot = frames.scene_mut().reserve();
    let task = frames.load(LoadRequest::Model {
        url: "no/such/dir/missing.glb".into(),
        slot,
        transform: Transform::default(),
    });
    let mut renderer = RecordingRenderer::default();
    let window = TestWindow::default();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut ticks = 0;
    while !frames.load_status(task).unwrap().is_terminal() {
        assert!(Instant::now() < deadline, "load never finished");
        time.set(ticks as f32 * 0.016);
        frames.tick(&mut renderer, &window);
        ticks += 1;
        std::thread::sleep(Duration::from_millis(5));
    }

    assert!(matches!(frames.load_status(task), Some(LoadStatus::Failed(_))));
    assert_eq!(frames.scene().len(), 1);
    assert_eq!(renderer.frames.len(), ticks);
    assert!(renderer.frames.iter().all(|f| f.len() == 1));

    frames.tick(&mut renderer, &window);
    assert_eq!(renderer.frames.len(), ticks + 1);
}

#[test]
fn finished_load_is_visible_in_the_same_tick_with_its_animation() {
    let time = Rc::new(Cell::new(1.0));
    let mut frames = frame_loop(&time);
    let slot = frames.scene_mut().reserve();
    frames.animate(slot, Spin::new(Vec3::new(0.0, 0.5, 0.0)));

    let task = frames.loads_mut().register("model.glb", LoadKind::Model);
    let epoch = frames.loads().epoch();
    frames
        .loads()
        .sender()
        .send(LoadEvent {
            task,
            epoch,
            kind: LoadEventKind::Succeeded(Attachment::Entity {
                slot,
                entity: cube("model"),
            }),
        })
        .unwrap();

    let mut renderer = RecordingRenderer::default();
    frames.tick(&mut renderer, &TestWindow::default());

    // Drained, then animated, then rendered
    assert_eq!(
        renderer.frames[0],
        vec![("model".to_string(), Vec3::new(0.0, 0.5, 0.0))]
    );
    assert_eq!(frames.load_status(task), Some(&LoadStatus::Succeeded));
}

#[test]
fn animation_of_missing_entity_is_skipped() {
    let time = Rc::new(Cell::new(0.5));
    let mut frames = frame_loop(&time);
    let slot = frames.scene_mut().reserve();
    frames.animate(slot, Spin::new(Vec3::ONE));
    let mut renderer = RecordingRenderer::default();

    frames.tick(&mut renderer, &TestWindow::default());
    assert_eq!(renderer.frames, vec![Vec::new()]);
}

#[test]
fn reset_discards_loads_from_the_old_scene() {
    let time = Rc::new(Cell::new(0.0));
    let mut frames = frame_loop(&time);
    let slot = frames.scene_mut().reserve();
    let task = frames.loads_mut().register("model.glb", LoadKind::Model);
    let sender = frames.loads().sender();
    let old_epoch = frames.loads().epoch();

    frames.reset_scene();
    sender
        .send(LoadEvent {
            task,
            epoch: old_epoch,
            kind: LoadEventKind::Succeeded(Attachment::Entity {
                slot,
                entity: cube("late"),
            }),
        })
        .unwrap();

    let mut renderer = RecordingRenderer::default();
    frames.tick(&mut renderer, &TestWindow::default());
    assert!(frames.scene().is_empty());
    assert_eq!(frames.load_status(task), Some(&LoadStatus::Discarded));
    assert_eq!(frames.interaction().name(), "none");
}

#[test]
fn interaction_writes_after_time_driven_animation() {
    let time = Rc::new(Cell::new(0.0));
    let mut frames = frame_loop(&time);
    let id = frames.scene_mut().add(cube("cube"));
    frames.animate(id, Spin::new(Vec3::new(1.0, 1.0, 0.0)));
    frames.set_interaction(Interaction::PointerFollow(PointerFollow::new(
        id,
        PointerFollowSettings {
            duration: 0.0,
            ..Default::default()
        },
    )));

    // Pointer at the bottom-right corner
    frames.handle_input(InputEvent::PointerMoved { x: 800.0, y: 600.0 });
    time.set(1.0);
    frames.tick(&mut RecordingRenderer::default(), &TestWindow::default());

    let range = PointerFollowSettings::default().range;
    let rotation = frames.scene().get(id).unwrap().transform.rotation;
    assert!((rotation.x - 0.5 * range).abs() < 1e-6);
    assert!((rotation.y - 0.5 * range).abs() < 1e-6);
}
