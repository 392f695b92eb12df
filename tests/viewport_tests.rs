use glam::Mat4;
use std::cell::RefCell;
use std::rc::Rc;

use scene_loop::camera::PerspectiveCamera;
use scene_loop::core::DisplayContext;
use scene_loop::error::ViewportError;
use scene_loop::render::{Composer, Renderer};
use scene_loop::scene::SceneState;
use scene_loop::viewport::Viewport;

type Log = Rc<RefCell<Vec<String>>>;

struct LoggingComposer {
    log: Log,
}

impl Composer for LoggingComposer {
    fn set_size(&mut self, output: DisplayContext) {
        self.log
            .borrow_mut()
            .push(format!("composer {}x{}", output.width, output.height));
    }

    fn pass_count(&self) -> usize {
        1
    }
}

struct LoggingRenderer {
    log: Log,
    composer: Option<LoggingComposer>,
}

impl LoggingRenderer {
    fn new(with_composer: bool) -> (Self, Log) {
        let log: Log = Rc::default();
        let composer = with_composer.then(|| LoggingComposer { log: log.clone() });
        (
            Self {
                log: log.clone(),
                composer,
            },
            log,
        )
    }
}

impl Renderer for LoggingRenderer {
    fn render(&mut self, _scene: &SceneState, _camera: &PerspectiveCamera) -> anyhow::Result<()> {
        Ok(())
    }

    fn resize(&mut self, output: DisplayContext) {
        self.log
            .borrow_mut()
            .push(format!("renderer {}x{}", output.width, output.height));
    }

    fn composer(&mut self) -> Option<&mut dyn Composer> {
        self.composer.as_mut().map(|c| c as &mut dyn Composer)
    }
}

fn camera() -> PerspectiveCamera {
    PerspectiveCamera::new(75.0, 800.0 / 600.0, 0.1, 1000.0)
}

#[test]
fn resize_updates_aspect_and_projection() {
    let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
    let mut camera = camera();
    let (mut renderer, _) = LoggingRenderer::new(false);

    let output = viewport
        .on_resize(1920.0, 1080.0, 1.0, &mut camera, &mut renderer)
        .unwrap();

    assert_eq!(output, DisplayContext::new(1920, 1080));
    assert!((camera.aspect() - 16.0 / 9.0).abs() < 1e-6);
    assert_eq!(camera.projection_aspect(), camera.aspect());
    assert_eq!(
        camera.projection_matrix(),
        Mat4::perspective_rh(75.0_f32.to_radians(), 1920.0 / 1080.0, 0.1, 1000.0)
    );
}

#[test]
fn every_resize_leaves_a_fresh_projection() {
    let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
    let mut camera = camera();
    let (mut renderer, _) = LoggingRenderer::new(false);

    for (w, h) in [(320.0, 240.0), (1000.0, 100.0), (100.0, 1000.0), (1.0, 1.0)] {
        viewport
            .on_resize(w, h, 1.0, &mut camera, &mut renderer)
            .unwrap();
        assert_eq!(camera.aspect(), w / h);
        assert_eq!(camera.projection_aspect(), w / h);
    }
}

#[test]
fn dense_displays_are_capped() {
    let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
    let mut camera = camera();
    let (mut renderer, log) = LoggingRenderer::new(false);

    let output = viewport
        .on_resize(400.0, 300.0, 3.0, &mut camera, &mut renderer)
        .unwrap();

    assert_eq!(output, DisplayContext::new(800, 600));
    assert_eq!(viewport.pixel_ratio(), 2.0);
    assert_eq!(viewport.output(), output);
    assert_eq!(*log.borrow(), vec!["renderer 800x600".to_string()]);
}

#[test]
fn renderer_resizes_before_composer() {
    let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
    let mut camera = camera();
    let (mut renderer, log) = LoggingRenderer::new(true);

    viewport
        .on_resize(1024.0, 768.0, 1.5, &mut camera, &mut renderer)
        .unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["renderer 1536x1152".to_string(), "composer 1536x1152".to_string()]
    );
}

#[test]
fn invalid_resize_changes_nothing() {
    let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
    let mut camera = camera();
    let (mut renderer, log) = LoggingRenderer::new(true);
    let projection = camera.projection_matrix();

    assert_eq!(
        viewport.on_resize(0.0, 600.0, 1.0, &mut camera, &mut renderer),
        Err(ViewportError::InvalidDimensions {
            width: 0.0,
            height: 600.0
        })
    );
    assert!(matches!(
        viewport.on_resize(800.0, f32::NAN, 1.0, &mut camera, &mut renderer),
        Err(ViewportError::InvalidDimensions { .. })
    ));
    assert_eq!(
        viewport.on_resize(800.0, 600.0, -1.0, &mut camera, &mut renderer),
        Err(ViewportError::InvalidPixelRatio(-1.0))
    );

    assert!(log.borrow().is_empty());
    assert_eq!(camera.projection_matrix(), projection);
    assert_eq!(viewport.width(), 800.0);
    assert_eq!(viewport.output(), DisplayContext::new(800, 600));
}

#[test]
fn bad_pixel_ratio_cap_falls_back_to_default() {
    let viewport = Viewport::new(800.0, 600.0, 3.0, 0.0);
    assert_eq!(viewport.max_pixel_ratio(), 2.0);
    assert_eq!(viewport.output(), DisplayContext::new(1600, 1200));
}
