use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::camera::PerspectiveCamera;
use crate::interaction::{OrbitSettings, PointerFollowSettings};
use crate::render::PostPass;
use crate::scene::{Light, Material, TextureSlot, Transform};
use crate::viewport::DEFAULT_MAX_PIXEL_RATIO;

/// Everything needed to build and run one scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub title: String,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub renderer: RendererConfig,
    pub meshes: Vec<MeshConfig>,
    pub lights: Vec<Light>,
    pub model: Option<ModelConfig>,
    pub environment: Option<EnvironmentConfig>,
    pub controls: ControlsConfig,
    pub post: Vec<PostPass>,
    /// Show the material/mesh/light control panel
    pub panel: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            title: "scene-loop".to_string(),
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            renderer: RendererConfig::default(),
            meshes: Vec::new(),
            lights: Vec::new(),
            model: None,
            environment: None,
            controls: ControlsConfig::None,
            post: Vec::new(),
            panel: false,
        }
    }
}

impl SceneConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid scene config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
        }
    }
}

impl CameraConfig {
    pub fn build(&self, aspect: f32) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(self.fov, aspect, self.near, self.far);
        self.apply(&mut camera);
        camera
    }

    /// Reset lens and placement, keeping the viewport-owned aspect
    pub fn apply(&self, camera: &mut PerspectiveCamera) {
        camera.fov = self.fov;
        camera.near = self.near;
        camera.far = self.far;
        camera.position = self.position;
        camera.look_at(self.target);
        camera.update_projection_matrix();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    None,
    #[default]
    AcesFilmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    /// Linear RGBA; alpha below 1 needs a compositing window surface
    pub clear_color: [f32; 4],
    pub max_pixel_ratio: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.0,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            max_pixel_ratio: DEFAULT_MAX_PIXEL_RATIO,
        }
    }
}

/// Procedural geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    },
}

/// Material parameters; colors are sRGB as authored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub color: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub transparent: bool,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            roughness: 1.0,
            metalness: 0.0,
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 1.0,
            opacity: 1.0,
            transparent: false,
        }
    }
}

impl MaterialConfig {
    pub fn to_material(&self) -> Material {
        Material {
            color: srgb_to_linear(self.color),
            roughness: self.roughness.clamp(0.0, 1.0),
            metalness: self.metalness.clamp(0.0, 1.0),
            emissive: srgb_to_linear(self.emissive),
            emissive_intensity: self.emissive_intensity.max(0.0),
            opacity: self.opacity.clamp(0.0, 1.0),
            transparent: self.transparent,
            ..Default::default()
        }
    }
}

pub fn srgb_to_linear(rgb: [f32; 3]) -> Vec3 {
    let channel = |c: f32| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(rgb[0]), channel(rgb[1]), channel(rgb[2]))
}

pub fn linear_to_srgb(color: Vec3) -> [f32; 3] {
    let channel = |c: f32| {
        let c = c.clamp(0.0, 1.0);
        if c <= 0.0031308 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    };
    [channel(color.x), channel(color.y), channel(color.z)]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureConfig {
    pub slot: TextureSlot,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    pub name: String,
    pub shape: Shape,
    #[serde(default)]
    pub material: MaterialConfig,
    #[serde(default)]
    pub transform: Transform,
    /// Radians per second around X, Y and Z
    #[serde(default)]
    pub spin: Option<Vec3>,
    #[serde(default)]
    pub textures: Vec<TextureConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub url: String,
    #[serde(default)]
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub url: String,
    #[serde(default)]
    pub background: bool,
    #[serde(default = "default_true")]
    pub lighting: bool,
}

fn default_true() -> bool {
    true
}

/// Input policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlsConfig {
    #[default]
    None,
    Orbit(OrbitSettings),
    /// Tilts the loaded model, or the first mesh when there is no model
    PointerFollow(PointerFollowSettings),
}
