use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window as WinitWindow, WindowId},
};

use scene_loop::cli::Cli;
use scene_loop::config::SceneConfig;
use scene_loop::core::{Button, GpuContext, WindowContext, WinitController};
use scene_loop::frame_loop::FrameLoop;
use scene_loop::render::{FrameStats, GpuRenderer};
use scene_loop::scene::SceneState;
use scene_loop::scenes;
use scene_loop::viewport::Viewport;
use scene_loop::window::Window;

// === Application ===

/// Everything that exists once the window and GPU are up
struct Running {
    window: Window,
    renderer: GpuRenderer,
    frame_loop: FrameLoop,
}

struct App {
    config: SceneConfig,
    show_ui: bool,
    input: WinitController,
    running: Option<Running>,
}

impl App {
    fn new(config: SceneConfig, show_ui: bool) -> Self {
        Self {
            config,
            show_ui,
            input: WinitController::new(),
            running: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let attributes = WinitWindow::default_attributes()
            .with_title(self.config.title.as_str())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_transparent(self.config.renderer.clear_color[3] < 1.0);
        let inner = Arc::new(event_loop.create_window(attributes)?);
        let window = Window::new(inner.clone());
        let dims = window.dimensions();

        let viewport = Viewport::new(
            dims.width,
            dims.height,
            dims.scale_factor,
            self.config.renderer.max_pixel_ratio,
        );
        let gpu = pollster::block_on(GpuContext::new(inner.clone(), viewport.output()))?;
        let mut renderer = GpuRenderer::new(gpu, self.config.renderer, self.config.post.clone());
        if self.show_ui {
            renderer.attach_overlay(&inner, self.config.panel);
        }

        let camera = self.config.camera.build(dims.width / dims.height.max(1.0));
        let mut frame_loop = FrameLoop::new(SceneState::new(), camera, viewport);
        frame_loop.on_resize(dims.width, dims.height, dims.scale_factor, &mut renderer)?;
        scenes::install(&self.config, &mut frame_loop);

        Ok(Running {
            window,
            renderer,
            frame_loop,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => {
                log::error!("failed to start: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        // Let egui see the event first
        let consumed = running
            .renderer
            .overlay_mut()
            .map_or(false, |overlay| overlay.handle_event(running.window.inner(), &event));

        // Button state tracks every event so a release over the overlay still
        // ends a drag; only unconsumed input reaches the scene
        let scale = running.window.scale_factor();
        if consumed {
            self.input.absorb_event(&event, scale);
        } else if let Some(input) = self.input.process_event(&event, scale) {
            running.frame_loop.handle_input(input);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { .. } if consumed => {}
            WindowEvent::KeyboardInput { event, .. } => match WinitController::key_action(&event) {
                Some(Button::Quit) => event_loop.exit(),
                Some(Button::Reset) => {
                    running.frame_loop.reset_scene();
                    scenes::install(&self.config, &mut running.frame_loop);
                }
                Some(Button::ToggleOverlay) => {
                    if let Some(overlay) = running.renderer.overlay_mut() {
                        overlay.toggle();
                    }
                }
                _ => {}
            },
            WindowEvent::Resized(size) => {
                let scale = running.window.scale_factor();
                let logical = size.to_logical::<f32>(scale);
                if let Err(e) = running.frame_loop.on_resize(
                    logical.width,
                    logical.height,
                    scale as f32,
                    &mut running.renderer,
                ) {
                    log::warn!("ignoring resize: {}", e);
                }
            }
            WindowEvent::RedrawRequested => {
                let frame_loop = &mut running.frame_loop;
                let stats = FrameStats::collect(
                    frame_loop.scene(),
                    frame_loop.fps(),
                    frame_loop.frame().number,
                    frame_loop.loads().pending(),
                    frame_loop.interaction().name(),
                );
                if let Some(overlay) = running.renderer.overlay_mut() {
                    overlay.prepare(running.window.inner(), frame_loop.scene_mut(), &stats);
                }
                frame_loop.tick(&mut running.renderer, &running.window);
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.scene_config()?;
    if cli.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, !cli.no_ui);

    log::info!("Controls: drag to orbit, wheel to zoom, R to reset, H to toggle UI, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
