pub mod compositor;
pub mod gpu;
pub mod overlay;
pub mod shaders;

pub use compositor::{PostComposer, PostPass};
pub use gpu::GpuRenderer;
pub use overlay::{FrameStats, Overlay};

use crate::camera::PerspectiveCamera;
use crate::core::DisplayContext;
use crate::scene::SceneState;

/// Draws a scene; the frame loop calls `render` exactly once per tick
pub trait Renderer {
    /// Render the current scene as seen from `camera`
    fn render(&mut self, scene: &SceneState, camera: &PerspectiveCamera) -> anyhow::Result<()>;

    /// Resize the output surface to physical pixels
    fn resize(&mut self, output: DisplayContext);

    /// Multi-pass compositor, if one is configured
    fn composer(&mut self) -> Option<&mut dyn Composer> {
        None
    }
}

/// Post-processing chain with its own intermediate buffers
pub trait Composer {
    /// Reallocate intermediate buffers for the new output size
    fn set_size(&mut self, output: DisplayContext);

    /// Number of shader passes after the scene pass
    fn pass_count(&self) -> usize;
}
