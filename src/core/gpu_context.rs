use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Limits, Queue, Surface};
use winit::window::Window;

use super::display_context::DisplayContext;

/// Device, queue and presentation surface for one window
///
/// Device and queue sit behind `Arc` so the compositor and overlay can keep
/// their own handles without borrowing the renderer.
pub struct GpuContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    surface: Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a GPU context presenting to `window`, sized to `size`
    pub async fn new(window: Arc<Window>, size: DisplayContext) -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("Failed to create window surface")?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let size = size.clamped(device.limits().max_texture_dimension_2d);
        let config = Self::create_surface_config(&surface, &adapter, size)?;
        surface.configure(&device, &config);

        log::info!(
            "GPU ready: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            surface,
            config,
        })
    }

    /// Get reference to the device
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Get reference to the queue
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    /// Color format of the presentation surface
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current surface size in physical pixels
    pub fn size(&self) -> DisplayContext {
        DisplayContext::new(self.config.width, self.config.height)
    }

    /// Largest surface side the device can present
    pub fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Reconfigure the swapchain for a new output size, scaled down to the
    /// device texture limit if needed
    pub fn resize(&mut self, size: DisplayContext) {
        let clamped = size.clamped(self.max_dimension());
        if clamped != size {
            log::warn!(
                "output {}x{} exceeds the device limit, presenting at {}x{}",
                size.width,
                size.height,
                clamped.width,
                clamped.height
            );
        }
        self.config.width = clamped.width.max(1);
        self.config.height = clamped.height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    /// Reapply the current configuration after a lost/outdated surface
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Next swapchain image
    pub fn acquire(&self) -> std::result::Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    fn create_surface_config(
        surface: &Surface,
        adapter: &Adapter,
        size: DisplayContext,
    ) -> Result<wgpu::SurfaceConfiguration> {
        let surface_caps = surface.get_capabilities(adapter);
        let fallback = *surface_caps
            .formats
            .first()
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(fallback);

        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::CompositeAlphaMode::PreMultiplied)
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }

    /// Request adapter with surface compatibility
    async fn request_adapter(instance: &Instance, surface: &Surface<'_>) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find appropriate adapter: {:?}", e))
    }

    /// Request device and queue
    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        adapter
            .request_device(&DeviceDescriptor {
                label: Some("Scene Loop Device"),
                required_features: Features::empty(),
                required_limits: Limits::default().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create device: {:?}", e))
    }
}
