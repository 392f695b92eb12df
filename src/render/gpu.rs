use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::compositor::{PostComposer, PostPass};
use super::overlay::Overlay;
use super::{shaders, Composer, Renderer};
use crate::camera::PerspectiveCamera;
use crate::config::{RendererConfig, ToneMapping};
use crate::core::{DisplayContext, GpuContext};
use crate::scene::{
    ColorSpace, EntityId, Environment, EnvironmentMap, Light, Material, MeshData, ModelPart, SceneState,
    TextureImage, TextureSlot, Vertex,
};

/// Lights beyond this many are ignored
pub const MAX_LIGHTS: usize = 8;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GpuLight {
    position: [f32; 4],
    color: [f32; 4],
    params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    env_ambient: [f32; 4],
    params: [f32; 4],
    lights: [GpuLight; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct PartUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
    pbr: [f32; 4],
}

fn pack_light(light: &Light) -> GpuLight {
    let scaled = |color: &[f32; 3], intensity: f32| {
        [color[0] * intensity, color[1] * intensity, color[2] * intensity, 1.0]
    };
    match light {
        Light::Ambient { color, intensity } => GpuLight {
            position: [0.0, 0.0, 0.0, 0.0],
            color: scaled(color, *intensity),
            params: [0.0; 4],
        },
        Light::Directional {
            color,
            intensity,
            position,
        } => GpuLight {
            position: [position[0], position[1], position[2], 1.0],
            color: scaled(color, *intensity),
            params: [0.0; 4],
        },
        Light::Point {
            color,
            intensity,
            position,
            distance,
            decay,
        } => GpuLight {
            position: [position[0], position[1], position[2], 2.0],
            color: scaled(color, *intensity),
            params: [*distance, *decay, 0.0, 0.0],
        },
    }
}

fn frame_uniforms(scene: &SceneState, camera: &PerspectiveCamera, settings: &RendererConfig) -> FrameUniforms {
    let view_proj = camera.view_projection();
    let mut lights = [GpuLight::zeroed(); MAX_LIGHTS];
    let count = scene.lights().len().min(MAX_LIGHTS);
    for (slot, light) in lights.iter_mut().zip(scene.lights()) {
        *slot = pack_light(light);
    }

    let (env_ambient, background) = match scene.environment() {
        Some(env) => {
            let a = env.map.ambient;
            let lighting = if env.usage.lighting { 1.0 } else { 0.0 };
            ([a.x, a.y, a.z, lighting], env.usage.background)
        }
        None => ([0.0; 4], false),
    };

    let tone_mapping = match settings.tone_mapping {
        ToneMapping::None => 0.0,
        ToneMapping::AcesFilmic => 1.0,
    };

    FrameUniforms {
        view_proj: view_proj.to_cols_array_2d(),
        inv_view_proj: view_proj.inverse().to_cols_array_2d(),
        camera_position: camera.position.extend(1.0).to_array(),
        env_ambient,
        params: [
            settings.exposure,
            tone_mapping,
            count as f32,
            if background { 1.0 } else { 0.0 },
        ],
        lights,
    }
}

/// Inverse-transpose of the model matrix, or the model itself when singular
fn normal_matrix(model: Mat4) -> Mat4 {
    if model.determinant().abs() < 1e-12 {
        model
    } else {
        model.inverse().transpose()
    }
}

fn part_uniforms(model: Mat4, material: &Material, normal_mapped: bool) -> PartUniforms {
    let emissive = material.emissive * material.emissive_intensity;
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    PartUniforms {
        model: model.to_cols_array_2d(),
        normal_matrix: normal_matrix(model).to_cols_array_2d(),
        color: material.color.extend(material.opacity).to_array(),
        emissive: emissive.extend(1.0).to_array(),
        pbr: [
            material.roughness,
            material.metalness,
            flag(normal_mapped),
            flag(material.is_blended()),
        ],
    }
}

/// One model part scheduled for drawing
struct Draw<'a> {
    key: (EntityId, usize),
    model: Mat4,
    part: &'a ModelPart,
    /// View-space z of the part's origin (more negative is farther)
    view_z: f32,
}

/// Split visible parts into the opaque list (scene order) and the blended
/// list (back to front)
fn collect_draws<'a>(scene: &'a SceneState, camera: &PerspectiveCamera) -> (Vec<Draw<'a>>, Vec<Draw<'a>>) {
    let view = camera.view_matrix();
    let mut opaque = Vec::new();
    let mut blended = Vec::new();

    for (id, entity) in scene.entities() {
        if !entity.visible {
            continue;
        }
        let model = entity.transform.matrix();
        for (index, part) in entity.model.parts.iter().enumerate() {
            if part.mesh.indices.is_empty() {
                continue;
            }
            let draw = Draw {
                key: (id, index),
                model,
                part,
                view_z: view.transform_point3(model.w_axis.truncate()).z,
            };
            if part.material.is_blended() {
                blended.push(draw);
            } else {
                opaque.push(draw);
            }
        }
    }

    blended.sort_by(|a, b| a.view_z.total_cmp(&b.view_z));
    (opaque, blended)
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Per-part uniforms and material bindings
struct DrawSlot {
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Texture ids the bind group was built with; 0 = default texture
    textures: [u64; 3],
}

struct EnvironmentBinding {
    /// 0 = placeholder
    id: u64,
    bind_group: wgpu::BindGroup,
    _texture: GpuTexture,
}

/// Forward renderer over a wgpu surface
///
/// Meshes and textures are uploaded on first use and cached by resource id;
/// anything the scene no longer references is released at the end of the
/// frame.
pub struct GpuRenderer {
    gpu: GpuContext,
    settings: RendererConfig,
    frame_layout: wgpu::BindGroupLayout,
    part_layout: wgpu::BindGroupLayout,
    frame_uniforms: wgpu::Buffer,
    environment: EnvironmentBinding,
    env_sampler: wgpu::Sampler,
    material_sampler: wgpu::Sampler,
    opaque_pipeline: wgpu::RenderPipeline,
    blended_pipeline: wgpu::RenderPipeline,
    background_pipeline: wgpu::RenderPipeline,
    depth_texture: wgpu::TextureView,
    white: GpuTexture,
    flat_normal: GpuTexture,
    meshes: HashMap<u64, GpuMesh>,
    textures: HashMap<u64, GpuTexture>,
    /// Images that could not be uploaded; the default texture stands in
    rejected: HashSet<u64>,
    slots: HashMap<(EntityId, usize), DrawSlot>,
    composer: Option<PostComposer>,
    overlay: Option<Overlay>,
}

impl GpuRenderer {
    pub fn new(gpu: GpuContext, settings: RendererConfig, post: Vec<PostPass>) -> Self {
        let device = gpu.device().clone();
        let queue = gpu.queue().clone();
        let format = gpu.surface_format();
        let size = gpu.size();

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                texture_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let part_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("part_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                texture_entry(1, true),
                texture_entry(2, true),
                texture_entry(3, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let frame_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = upload_environment_texels(&device, &queue, 1, 1, &[0.0, 0.0, 0.0, 1.0]);
        let environment = EnvironmentBinding {
            id: 0,
            bind_group: create_frame_bind_group(&device, &frame_layout, &frame_uniforms, &placeholder.view, &env_sampler),
            _texture: placeholder,
        };

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::mesh_shader().into()),
        });
        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("background_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::background_shader().into()),
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &part_layout],
            push_constant_ranges: &[],
        });
        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("background_pipeline_layout"),
            bind_group_layouts: &[&frame_layout],
            push_constant_ranges: &[],
        });

        let opaque_pipeline = create_mesh_pipeline(&device, &mesh_layout, &mesh_shader, format, false);
        let blended_pipeline = create_mesh_pipeline(&device, &mesh_layout, &mesh_shader, format, true);
        let background_pipeline = create_background_pipeline(&device, &background_layout, &background_shader, format);

        let white = upload_texture(&device, &queue, 1, 1, wgpu::TextureFormat::Rgba8Unorm, &[255, 255, 255, 255]);
        let flat_normal = upload_texture(&device, &queue, 1, 1, wgpu::TextureFormat::Rgba8Unorm, &[128, 128, 255, 255]);

        let composer = if post.is_empty() {
            None
        } else {
            log::info!("post-processing: {} pass(es)", post.len());
            Some(PostComposer::new(device.clone(), format, size, post))
        };

        Self {
            depth_texture: create_depth_texture(&device, size),
            gpu,
            settings,
            frame_layout,
            part_layout,
            frame_uniforms,
            environment,
            env_sampler,
            material_sampler,
            opaque_pipeline,
            blended_pipeline,
            background_pipeline,
            white,
            flat_normal,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            rejected: HashSet::new(),
            slots: HashMap::new(),
            composer,
            overlay: None,
        }
    }

    /// Add the egui stats window, plus the control panel if `panel` is set
    pub fn attach_overlay(&mut self, window: &Window, panel: bool) {
        self.overlay = Some(Overlay::new(
            window,
            self.gpu.device(),
            self.gpu.surface_format(),
            panel,
        ));
    }

    pub fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        self.overlay.as_mut()
    }

    pub fn settings(&self) -> &RendererConfig {
        &self.settings
    }

    pub fn output_size(&self) -> DisplayContext {
        self.gpu.size()
    }

    /// Upload whatever the scene's environment needs
    fn sync_environment(&mut self, environment: Option<&Environment>) {
        let wanted = environment.map(|env| env.map.id()).unwrap_or(0);
        if wanted == self.environment.id || self.rejected.contains(&wanted) {
            return;
        }

        let device = self.gpu.device();
        let texture = match environment {
            Some(env) if fits_device(device, env.map.width, env.map.height) => {
                upload_environment(device, self.gpu.queue(), &env.map)
            }
            Some(env) => {
                log::warn!(
                    "environment map {}x{} exceeds the device texture limit, ignoring it",
                    env.map.width,
                    env.map.height
                );
                self.rejected.insert(wanted);
                return;
            }
            None => upload_environment_texels(device, self.gpu.queue(), 1, 1, &[0.0, 0.0, 0.0, 1.0]),
        };

        self.environment = EnvironmentBinding {
            id: wanted,
            bind_group: create_frame_bind_group(
                device,
                &self.frame_layout,
                &self.frame_uniforms,
                &texture.view,
                &self.env_sampler,
            ),
            _texture: texture,
        };
    }

    /// Upload an image on first use. Returns its id, or 0 to use the default.
    fn sync_texture(&mut self, image: Option<&Arc<TextureImage>>, used: &mut HashSet<u64>) -> u64 {
        let Some(image) = image else {
            return 0;
        };
        let id = image.id();
        if self.rejected.contains(&id) {
            return 0;
        }
        if !self.textures.contains_key(&id) {
            let device = self.gpu.device();
            if !fits_device(device, image.width, image.height) {
                log::warn!(
                    "texture {}x{} exceeds the device texture limit, using the default",
                    image.width,
                    image.height
                );
                self.rejected.insert(id);
                return 0;
            }
            let format = match image.color_space {
                ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
                ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
            };
            let texture = upload_texture(device, self.gpu.queue(), image.width, image.height, format, &image.rgba);
            self.textures.insert(id, texture);
        }
        used.insert(id);
        id
    }

    fn sync_mesh(&mut self, mesh: &MeshData) {
        let device = self.gpu.device();
        self.meshes.entry(mesh.id()).or_insert_with(|| GpuMesh {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertex_buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_index_buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: mesh.indices.len() as u32,
        });
    }

    /// Make buffers, textures and bindings current for every draw, then
    /// release what the scene no longer uses
    fn sync_draws<'a>(&mut self, draws: impl Iterator<Item = &'a Draw<'a>>) {
        let mut used_meshes = HashSet::new();
        let mut used_textures = HashSet::new();
        let mut used_slots = HashSet::new();

        for draw in draws {
            let material = &draw.part.material;
            self.sync_mesh(&draw.part.mesh);
            used_meshes.insert(draw.part.mesh.id());

            let textures = [
                self.sync_texture(material.map(TextureSlot::Color), &mut used_textures),
                self.sync_texture(material.map(TextureSlot::Roughness), &mut used_textures),
                self.sync_texture(material.map(TextureSlot::Normal), &mut used_textures),
            ];

            let stale = self
                .slots
                .get(&draw.key)
                .map_or(true, |slot| slot.textures != textures);
            if stale {
                let slot = self.create_slot(textures);
                self.slots.insert(draw.key, slot);
            }
            used_slots.insert(draw.key);

            if let Some(slot) = self.slots.get(&draw.key) {
                let uniforms = part_uniforms(draw.model, material, textures[2] != 0);
                self.gpu
                    .queue()
                    .write_buffer(&slot.uniforms, 0, bytemuck::bytes_of(&uniforms));
            }
        }

        self.meshes.retain(|id, _| used_meshes.contains(id));
        self.textures.retain(|id, _| used_textures.contains(id));
        self.slots.retain(|key, _| used_slots.contains(key));
    }

    fn view_or(&self, id: u64, fallback: &GpuTexture) -> wgpu::TextureView {
        match self.textures.get(&id) {
            Some(texture) => texture.view.clone(),
            None => fallback.view.clone(),
        }
    }

    fn create_slot(&self, textures: [u64; 3]) -> DrawSlot {
        let device = self.gpu.device();
        let color = self.view_or(textures[0], &self.white);
        let roughness = self.view_or(textures[1], &self.white);
        let normal = self.view_or(textures[2], &self.flat_normal);

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("part_uniforms"),
            size: std::mem::size_of::<PartUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("part_bind_group"),
            layout: &self.part_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&color),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&roughness),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&normal),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.material_sampler),
                },
            ],
        });

        DrawSlot {
            uniforms,
            bind_group,
            textures,
        }
    }
}

impl Renderer for GpuRenderer {
    fn render(&mut self, scene: &SceneState, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        let frame = match self.gpu.acquire() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e).context("failed to acquire surface texture"),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.sync_environment(scene.environment());
        let (opaque, blended) = collect_draws(scene, camera);
        self.sync_draws(opaque.iter().chain(blended.iter()));

        let uniforms = frame_uniforms(scene, camera, &self.settings);
        self.gpu
            .queue()
            .write_buffer(&self.frame_uniforms, 0, bytemuck::bytes_of(&uniforms));
        let draw_background = scene.environment().is_some_and(|env| env.usage.background)
            && self.environment.id != 0;

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        let [r, g, b, a] = self.settings.clear_color.map(f64::from);
        {
            let target = self.composer.as_ref().map_or(&view, |c| c.input_view());
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // The surface expects premultiplied alpha
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r * a,
                            g: g * a,
                            b: b * a,
                            a,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_bind_group(0, &self.environment.bind_group, &[]);

            pass.set_pipeline(&self.opaque_pipeline);
            record_draws(&mut pass, &opaque, &self.meshes, &self.slots);

            if draw_background {
                pass.set_pipeline(&self.background_pipeline);
                pass.draw(0..3, 0..1);
            }

            pass.set_pipeline(&self.blended_pipeline);
            record_draws(&mut pass, &blended, &self.meshes, &self.slots);
        }

        if let Some(composer) = &self.composer {
            composer.run(&mut encoder, &view);
        }

        let overlay_commands = match &mut self.overlay {
            Some(overlay) => overlay.paint(
                self.gpu.device(),
                self.gpu.queue(),
                &mut encoder,
                &view,
                self.gpu.size(),
            ),
            None => Vec::new(),
        };

        self.gpu
            .queue()
            .submit(overlay_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }

    fn resize(&mut self, output: DisplayContext) {
        self.gpu.resize(output);
        self.depth_texture = create_depth_texture(self.gpu.device(), self.gpu.size());
    }

    fn composer(&mut self) -> Option<&mut dyn Composer> {
        self.composer.as_mut().map(|c| c as &mut dyn Composer)
    }
}

fn record_draws(
    pass: &mut wgpu::RenderPass<'_>,
    draws: &[Draw<'_>],
    meshes: &HashMap<u64, GpuMesh>,
    slots: &HashMap<(EntityId, usize), DrawSlot>,
) {
    for draw in draws {
        let (Some(mesh), Some(slot)) = (meshes.get(&draw.part.mesh.id()), slots.get(&draw.key)) else {
            continue;
        };
        pass.set_bind_group(1, &slot.bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    environment: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(environment),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blended: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if blended { "blended_pipeline" } else { "opaque_pipeline" }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![
                    0 => Float32x3,
                    1 => Float32x3,
                    2 => Float32x2,
                ],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(if blended {
                    wgpu::BlendState::ALPHA_BLENDING
                } else {
                    wgpu::BlendState::REPLACE
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            // Both faces are lit; the shader flips back-facing normals
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !blended,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn create_background_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("background_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        // Far plane only: fills pixels no opaque geometry covered
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn create_depth_texture(device: &wgpu::Device, size: DisplayContext) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn fits_device(device: &wgpu::Device, width: u32, height: u32) -> bool {
    let max = device.limits().max_texture_dimension_2d;
    width > 0 && height > 0 && width <= max && height <= max
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    data: &[u8],
) -> GpuTexture {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("scene_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}

fn upload_environment_texels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    texels: &[f32],
) -> GpuTexture {
    upload_texture(
        device,
        queue,
        width,
        height,
        wgpu::TextureFormat::Rgba32Float,
        bytemuck::cast_slice(texels),
    )
}

fn upload_environment(device: &wgpu::Device, queue: &wgpu::Queue, map: &EnvironmentMap) -> GpuTexture {
    log::debug!("uploading environment map {}x{}", map.width, map.height);
    upload_environment_texels(device, queue, map.width, map.height, &map.texels)
}
