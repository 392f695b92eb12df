use std::sync::Arc;
use winit::window::Window as WinitWindow;

use crate::core::{WindowContext, WindowDimensions};

/// Wrapper around a winit window as seen by the frame loop
pub struct Window {
    inner: Arc<WinitWindow>,
}

impl Window {
    pub fn new(window: Arc<WinitWindow>) -> Self {
        Self { inner: window }
    }

    pub fn inner(&self) -> &Arc<WinitWindow> {
        &self.inner
    }

    pub fn scale_factor(&self) -> f64 {
        self.inner.scale_factor()
    }

    pub fn inner_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.inner.inner_size()
    }
}

impl WindowContext for Window {
    fn dimensions(&self) -> WindowDimensions {
        let scale = self.inner.scale_factor();
        let logical = self.inner.inner_size().to_logical::<f32>(scale);
        WindowDimensions::new(logical.width, logical.height, scale as f32)
    }

    fn request_redraw(&self) {
        self.inner.request_redraw();
    }
}
