use crate::camera::PerspectiveCamera;
use crate::core::DisplayContext;
use crate::error::ViewportError;
use crate::render::Renderer;

/// Default cap on device pixel density for the output surface
pub const DEFAULT_MAX_PIXEL_RATIO: f32 = 2.0;

/// Keeps camera aspect, projection and output surface size in step with the
/// host window
#[derive(Debug, Clone)]
pub struct Viewport {
    max_pixel_ratio: f32,
    width: f32,
    height: f32,
    pixel_ratio: f32,
    output: DisplayContext,
}

impl Viewport {
    /// Viewport for an initial logical window size. Nothing is resized yet;
    /// call [`Viewport::on_resize`] once the renderer exists.
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        let max_pixel_ratio = if max_pixel_ratio.is_finite() && max_pixel_ratio > 0.0 {
            max_pixel_ratio
        } else {
            log::warn!(
                "max pixel ratio {} is not usable, falling back to {}",
                max_pixel_ratio,
                DEFAULT_MAX_PIXEL_RATIO
            );
            DEFAULT_MAX_PIXEL_RATIO
        };
        let width = width.max(1.0);
        let height = height.max(1.0);
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };

        Self {
            max_pixel_ratio,
            width,
            height,
            pixel_ratio: DisplayContext::effective_pixel_ratio(device_pixel_ratio, max_pixel_ratio),
            output: DisplayContext::from_logical(width, height, device_pixel_ratio, max_pixel_ratio),
        }
    }

    /// React to a host resize notification.
    ///
    /// Order: camera aspect, camera projection, renderer output, compositor
    /// buffers. Invalid input is rejected before anything is touched.
    pub fn on_resize(
        &mut self,
        width: f32,
        height: f32,
        device_pixel_ratio: f32,
        camera: &mut PerspectiveCamera,
        renderer: &mut dyn Renderer,
    ) -> Result<DisplayContext, ViewportError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ViewportError::InvalidDimensions { width, height });
        }
        if !(device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0) {
            return Err(ViewportError::InvalidPixelRatio(device_pixel_ratio));
        }

        self.width = width;
        self.height = height;
        self.pixel_ratio = DisplayContext::effective_pixel_ratio(device_pixel_ratio, self.max_pixel_ratio);
        self.output = DisplayContext::from_logical(width, height, device_pixel_ratio, self.max_pixel_ratio);

        camera.set_aspect(width / height);
        camera.update_projection_matrix();

        renderer.resize(self.output);
        if let Some(composer) = renderer.composer() {
            composer.set_size(self.output);
        }

        log::debug!(
            "viewport {}x{} @{} -> output {}x{}",
            width,
            height,
            self.pixel_ratio,
            self.output.width,
            self.output.height
        );
        Ok(self.output)
    }

    /// Logical width
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Logical height
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Pixel ratio in effect after capping
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn max_pixel_ratio(&self) -> f32 {
        self.max_pixel_ratio
    }

    /// Physical output size
    pub fn output(&self) -> DisplayContext {
        self.output
    }
}
