use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wgpu::util::DeviceExt;

use super::shaders;
use super::Composer;
use crate::core::DisplayContext;

/// Screen-space effect applied after the scene pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostPass {
    /// Red and blue sampled `amount` UV units apart along `angle` (radians)
    RgbShift { amount: f32, angle: f32 },
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ShiftUniforms {
    params: [f32; 4],
}

impl PostPass {
    fn uniforms(&self) -> ShiftUniforms {
        match *self {
            PostPass::RgbShift { amount, angle } => ShiftUniforms {
                params: [amount, angle, 0.0, 0.0],
            },
        }
    }
}

struct Target {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Chain of fullscreen passes ping-ponging between two offscreen targets.
///
/// The scene renders into [`PostComposer::input_view`]; [`PostComposer::run`]
/// then applies each pass in order, the last one writing to the surface.
pub struct PostComposer {
    device: Arc<wgpu::Device>,
    format: wgpu::TextureFormat,
    passes: Vec<PostPass>,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: Vec<wgpu::Buffer>,
    targets: [Target; 2],
    /// One per pass, reading from target `i % 2`
    bind_groups: Vec<wgpu::BindGroup>,
    size: DisplayContext,
}

impl PostComposer {
    pub fn new(
        device: Arc<wgpu::Device>,
        format: wgpu::TextureFormat,
        size: DisplayContext,
        passes: Vec<PostPass>,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rgb_shift_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::RGB_SHIFT_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("rgb_shift_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniforms = passes
            .iter()
            .map(|pass| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("post_uniforms"),
                    contents: bytemuck::bytes_of(&pass.uniforms()),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
            })
            .collect();

        let size = size.clamped(device.limits().max_texture_dimension_2d);
        let targets = [
            create_target(&device, format, size),
            create_target(&device, format, size),
        ];

        let mut composer = Self {
            device,
            format,
            passes,
            pipeline,
            layout,
            sampler,
            uniforms,
            targets,
            bind_groups: Vec::new(),
            size,
        };
        composer.rebuild_bind_groups();
        composer
    }

    pub fn passes(&self) -> &[PostPass] {
        &self.passes
    }

    /// Current size of the intermediate targets
    pub fn size(&self) -> DisplayContext {
        self.size
    }

    /// Where the scene pass should render
    pub fn input_view(&self) -> &wgpu::TextureView {
        &self.targets[0].view
    }

    /// Record every pass; the last one writes to `output`
    pub fn run(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let last = self.passes.len().saturating_sub(1);
        for (i, bind_group) in self.bind_groups.iter().enumerate() {
            let target = if i == last {
                output
            } else {
                &self.targets[(i + 1) % 2].view
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("post_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    fn rebuild_bind_groups(&mut self) {
        self.bind_groups = self
            .uniforms
            .iter()
            .enumerate()
            .map(|(i, uniforms)| {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("post_bind_group"),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&self.targets[i % 2].view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: uniforms.as_entire_binding(),
                        },
                    ],
                })
            })
            .collect();
    }
}

impl Composer for PostComposer {
    fn set_size(&mut self, output: DisplayContext) {
        // Must match the surface clamp in GpuContext::resize
        let output = output.clamped(self.device.limits().max_texture_dimension_2d);
        if output == self.size {
            return;
        }
        self.targets = [
            create_target(&self.device, self.format, output),
            create_target(&self.device, self.format, output),
        ];
        self.size = output;
        self.rebuild_bind_groups();
        log::debug!("composer targets {}x{}", output.width, output.height);
    }

    fn pass_count(&self) -> usize {
        self.passes.len()
    }
}

fn create_target(device: &wgpu::Device, format: wgpu::TextureFormat, size: DisplayContext) -> Target {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("post_target"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Target {
        _texture: texture,
        view,
    }
}
