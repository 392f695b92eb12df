pub mod camera;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod frame;
pub mod frame_loop;
pub mod interaction;
pub mod loaders;
pub mod render;
pub mod scene;
pub mod scenes;
pub mod viewport;
pub mod window;

pub use frame_loop::{FrameLoop, Spin};
pub use scene::{Entity, EntityId, SceneState};
