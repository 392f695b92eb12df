use std::f32::consts::PI;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::config::{linear_to_srgb, srgb_to_linear};
use crate::core::DisplayContext;
use crate::scene::{Entity, Light, SceneState};

/// Numbers shown in the stats window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub fps: f32,
    pub frame: u64,
    pub entities: usize,
    pub triangles: usize,
    pub pending_loads: usize,
    pub interaction: &'static str,
}

impl FrameStats {
    pub fn collect(scene: &SceneState, fps: f32, frame: u64, pending_loads: usize, interaction: &'static str) -> Self {
        Self {
            fps,
            frame,
            entities: scene.len(),
            triangles: scene.entities().map(|(_, e)| e.model.triangle_count()).sum(),
            pending_loads,
            interaction,
        }
    }
}

struct PreparedUi {
    primitives: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
    pixels_per_point: f32,
    /// Physical window width the UI was laid out for
    window_width: u32,
}

/// egui stats window and scene control panel
///
/// The UI is built between frames by [`Overlay::prepare`], which may edit the
/// scene directly, and painted over the finished frame by the renderer.
pub struct Overlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    panel: bool,
    visible: bool,
    prepared: Option<PreparedUi>,
}

impl Overlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat, panel: bool) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        Self {
            ctx,
            state,
            renderer,
            panel,
            visible: true,
            prepared: None,
        }
    }

    /// Feed a window event to egui. Returns true if the UI consumed it.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        if !self.visible {
            return false;
        }
        self.state.on_window_event(window, event).consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("overlay {}", if self.visible { "shown" } else { "hidden" });
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Run the UI for the coming frame
    pub fn prepare(&mut self, window: &Window, scene: &mut SceneState, stats: &FrameStats) {
        if !self.visible {
            return;
        }
        let raw_input = self.state.take_egui_input(window);
        let panel = self.panel;
        let full_output = self.ctx.run(raw_input, |ctx| {
            draw_ui(ctx, scene, stats, panel);
        });
        self.state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        // A frame that never got painted still owes its texture updates
        let mut textures = match self.prepared.take() {
            Some(stale) => stale.textures,
            None => egui::TexturesDelta::default(),
        };
        textures.append(full_output.textures_delta);

        self.prepared = Some(PreparedUi {
            primitives,
            textures,
            pixels_per_point: full_output.pixels_per_point,
            window_width: window.inner_size().width.max(1),
        });
    }

    /// Draw the prepared UI onto `view` without clearing it
    pub(crate) fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        output: DisplayContext,
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(prepared) = self.prepared.take() else {
            return Vec::new();
        };

        for (id, image_delta) in &prepared.textures.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        // The output may be rendered below native density
        let scale = output.width as f32 / prepared.window_width as f32;
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [output.width, output.height],
            pixels_per_point: prepared.pixels_per_point * scale,
        };

        let commands = self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &prepared.primitives,
            &screen_descriptor,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.renderer.render(
                &mut render_pass.forget_lifetime(),
                &prepared.primitives,
                &screen_descriptor,
            );
        }

        for id in &prepared.textures.free {
            self.renderer.free_texture(id);
        }
        commands
    }
}

/// Build the whole overlay for one frame
pub fn draw_ui(ctx: &egui::Context, scene: &mut SceneState, stats: &FrameStats, panel: bool) {
    egui::Window::new("FPS")
        .title_bar(false)
        .resizable(false)
        .fixed_pos(egui::pos2(10.0, 10.0))
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("{:.0}", stats.fps))
                    .size(48.0)
                    .color(egui::Color32::from_rgb(74, 158, 255)),
            );
            ui.label(
                egui::RichText::new("FPS")
                    .size(12.0)
                    .color(egui::Color32::GRAY),
            );
            ui.label(
                egui::RichText::new(format!(
                    "frame {}  entities {}  triangles {}  loading {}  input {}",
                    stats.frame, stats.entities, stats.triangles, stats.pending_loads, stats.interaction
                ))
                .size(11.0)
                .color(egui::Color32::GRAY),
            );
        });

    if !panel {
        return;
    }

    egui::Window::new("Controls")
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            for (id, entity) in scene.entities_mut() {
                egui::CollapsingHeader::new(entity.name.as_str())
                    .id_salt(("entity", id.0))
                    .show(ui, |ui| entity_controls(ui, entity));
            }
            for (i, light) in scene.lights_mut().iter_mut().enumerate() {
                egui::CollapsingHeader::new(light.label())
                    .id_salt(("light", i))
                    .show(ui, |ui| light_controls(ui, light));
            }
        });
}

fn vec3_row(ui: &mut egui::Ui, label: &str, value: &mut glam::Vec3, speed: f64) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut value.x).speed(speed));
        ui.add(egui::DragValue::new(&mut value.y).speed(speed));
        ui.add(egui::DragValue::new(&mut value.z).speed(speed));
    });
}

fn color_row(ui: &mut egui::Ui, label: &str, linear: &mut glam::Vec3) {
    ui.horizontal(|ui| {
        let mut srgb = linear_to_srgb(*linear);
        if ui.color_edit_button_rgb(&mut srgb).changed() {
            *linear = srgb_to_linear(srgb);
        }
        ui.label(label);
    });
}

fn entity_controls(ui: &mut egui::Ui, entity: &mut Entity) {
    ui.checkbox(&mut entity.visible, "visible");

    ui.label("Mesh");
    let transform = &mut entity.transform;
    vec3_row(ui, "position", &mut transform.position, 0.05);
    ui.add(egui::Slider::new(&mut transform.rotation.x, -PI..=PI).text("rotation x"));
    ui.add(egui::Slider::new(&mut transform.rotation.y, -PI..=PI).text("rotation y"));
    ui.add(egui::Slider::new(&mut transform.rotation.z, -PI..=PI).text("rotation z"));
    vec3_row(ui, "scale", &mut transform.scale, 0.01);

    for (i, part) in entity.model.parts.iter_mut().enumerate() {
        ui.separator();
        ui.label(format!("Material {}", i));
        let material = &mut part.material;
        color_row(ui, "color", &mut material.color);
        ui.add(egui::Slider::new(&mut material.roughness, 0.0..=1.0).text("roughness"));
        ui.add(egui::Slider::new(&mut material.metalness, 0.0..=1.0).text("metalness"));
        color_row(ui, "emissive", &mut material.emissive);
        ui.add(egui::Slider::new(&mut material.emissive_intensity, 0.0..=10.0).text("emissive intensity"));
        ui.add(egui::Slider::new(&mut material.opacity, 0.0..=1.0).text("opacity"));
        ui.checkbox(&mut material.transparent, "transparent");
    }
}

fn light_controls(ui: &mut egui::Ui, light: &mut Light) {
    ui.add(egui::Slider::new(light.intensity_mut(), 0.0..=10.0).text("intensity"));
    ui.horizontal(|ui| {
        ui.color_edit_button_rgb(light.color_mut());
        ui.label("color");
    });
    if let Some(position) = light.position_mut() {
        ui.horizontal(|ui| {
            ui.label("position");
            for c in position.iter_mut() {
                ui.add(egui::DragValue::new(c).speed(0.1));
            }
        });
    }
}
