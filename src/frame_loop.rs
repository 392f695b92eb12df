use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;
use crate::core::{DisplayContext, ElapsedClock, FrameClock, WindowContext};
use crate::error::ViewportError;
use crate::frame::{FpsCounter, FrameInfo};
use crate::interaction::{InputEvent, Interaction};
use crate::loaders::{LoadQueue, LoadRequest, LoadStatus, TaskId};
use crate::render::Renderer;
use crate::scene::{EntityId, SceneState};
use crate::viewport::Viewport;

/// Rotation as a pure function of elapsed time: `base + rate * elapsed`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub base: Vec3,
    /// Radians per second around each axis
    pub rate: Vec3,
}

impl Spin {
    pub fn new(rate: Vec3) -> Self {
        Self {
            base: Vec3::ZERO,
            rate,
        }
    }

    pub fn rotation_at(&self, elapsed: f32) -> Vec3 {
        self.base + self.rate * elapsed
    }
}

/// Owns the scene and everything that changes it, and turns each display
/// refresh into exactly one rendered frame.
pub struct FrameLoop<C: FrameClock = ElapsedClock> {
    clock: C,
    scene: SceneState,
    camera: PerspectiveCamera,
    viewport: Viewport,
    interaction: Interaction,
    animations: Vec<(EntityId, Spin)>,
    loads: LoadQueue,
    frame: FrameInfo,
    previous_elapsed: f32,
    fps: FpsCounter,
}

impl FrameLoop<ElapsedClock> {
    pub fn new(scene: SceneState, camera: PerspectiveCamera, viewport: Viewport) -> Self {
        Self::with_clock(ElapsedClock::new(), scene, camera, viewport)
    }
}

impl<C: FrameClock> FrameLoop<C> {
    pub fn with_clock(clock: C, scene: SceneState, camera: PerspectiveCamera, viewport: Viewport) -> Self {
        Self {
            clock,
            scene,
            camera,
            viewport,
            interaction: Interaction::None,
            animations: Vec::new(),
            loads: LoadQueue::new(),
            frame: FrameInfo::default(),
            previous_elapsed: 0.0,
            fps: FpsCounter::new(),
        }
    }

    /// Run one frame: apply finished loads, advance animations and
    /// interaction, render once, then ask the window for the next frame.
    pub fn tick(&mut self, renderer: &mut dyn Renderer, window: &dyn WindowContext) -> FrameInfo {
        self.loads.drain(&mut self.scene);

        let elapsed = self.clock.elapsed();
        let delta = (elapsed - self.previous_elapsed).max(0.0);
        self.previous_elapsed = elapsed;
        self.frame = FrameInfo::new(self.frame.number + 1, elapsed, delta);

        for (id, spin) in &self.animations {
            match self.scene.get_mut(*id) {
                Some(entity) => entity.transform.rotation = spin.rotation_at(elapsed),
                None => log::trace!("animation target {} not attached, skipping", id),
            }
        }

        self.interaction
            .update(delta, elapsed, &mut self.camera, &mut self.scene);

        if let Err(e) = renderer.render(&self.scene, &self.camera) {
            log::warn!("render failed: {:#}", e);
        }

        if let Some(fps) = self.fps.update(delta) {
            log::debug!("FPS: {:.1}", fps);
        }

        window.request_redraw();
        self.frame
    }

    /// Start loading a resource in the background
    pub fn load(&mut self, request: LoadRequest) -> TaskId {
        log::info!("loading {}", request.url());
        self.loads.submit(request)
    }

    pub fn load_status(&self, task: TaskId) -> Option<&LoadStatus> {
        self.loads.task(task).map(|t| &t.status)
    }

    pub fn loads(&self) -> &LoadQueue {
        &self.loads
    }

    pub fn loads_mut(&mut self) -> &mut LoadQueue {
        &mut self.loads
    }

    /// Host resize notification in logical pixels
    pub fn on_resize(
        &mut self,
        width: f32,
        height: f32,
        device_pixel_ratio: f32,
        renderer: &mut dyn Renderer,
    ) -> Result<DisplayContext, ViewportError> {
        self.viewport
            .on_resize(width, height, device_pixel_ratio, &mut self.camera, renderer)
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        let now = self.clock.elapsed();
        self.interaction
            .handle(&event, now, &self.viewport, &self.scene);
    }

    /// Tear the scene down. Loads still in flight will not attach, and
    /// animations and interaction are dropped with the entities they drove.
    pub fn reset_scene(&mut self) {
        self.scene.clear();
        self.loads.invalidate();
        self.animations.clear();
        self.interaction = Interaction::None;
        log::info!("scene reset (epoch {})", self.loads.epoch());
    }

    pub fn set_interaction(&mut self, interaction: Interaction) {
        log::debug!("interaction: {}", interaction.name());
        self.interaction = interaction;
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Drive `entity`'s rotation from elapsed time
    pub fn animate(&mut self, entity: EntityId, spin: Spin) {
        self.animations.push((entity, spin));
    }

    /// Most recently completed frame
    pub fn frame(&self) -> FrameInfo {
        self.frame
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }
}
