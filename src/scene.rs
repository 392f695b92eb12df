use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id for GPU-cacheable resources (meshes, textures, maps)
fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to an entity slot in a [`SceneState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mesh vertex as uploaded to the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle list
#[derive(Debug)]
pub struct MeshData {
    id: u64,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            id: next_resource_id(),
            vertices,
            indices,
        }
    }

    /// Stable id for GPU buffer caching
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// How texel values should be interpreted when sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

/// Decoded RGBA8 image
#[derive(Debug)]
pub struct TextureImage {
    id: u64,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub color_space: ColorSpace,
}

impl TextureImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>, color_space: ColorSpace) -> Self {
        Self {
            id: next_resource_id(),
            width,
            height,
            rgba,
            color_space,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Material texture inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    Color,
    Roughness,
    Normal,
}

impl TextureSlot {
    /// Color maps carry sRGB-encoded values, data maps are linear
    pub fn color_space(self) -> ColorSpace {
        match self {
            TextureSlot::Color => ColorSpace::Srgb,
            TextureSlot::Roughness | TextureSlot::Normal => ColorSpace::Linear,
        }
    }
}

/// Metal/roughness surface description
#[derive(Debug, Clone)]
pub struct Material {
    pub color: Vec3,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub color_map: Option<Arc<TextureImage>>,
    pub roughness_map: Option<Arc<TextureImage>>,
    pub normal_map: Option<Arc<TextureImage>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            roughness: 1.0,
            metalness: 0.0,
            emissive: Vec3::ZERO,
            emissive_intensity: 1.0,
            opacity: 1.0,
            transparent: false,
            color_map: None,
            roughness_map: None,
            normal_map: None,
        }
    }
}

impl Material {
    pub fn map(&self, slot: TextureSlot) -> Option<&Arc<TextureImage>> {
        match slot {
            TextureSlot::Color => self.color_map.as_ref(),
            TextureSlot::Roughness => self.roughness_map.as_ref(),
            TextureSlot::Normal => self.normal_map.as_ref(),
        }
    }

    pub fn set_map(&mut self, slot: TextureSlot, image: Arc<TextureImage>) {
        let target = match slot {
            TextureSlot::Color => &mut self.color_map,
            TextureSlot::Roughness => &mut self.roughness_map,
            TextureSlot::Normal => &mut self.normal_map,
        };
        *target = Some(image);
    }

    /// Drawn in the blended pass
    pub fn is_blended(&self) -> bool {
        self.transparent && self.opacity < 1.0
    }
}

/// Scene light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    /// Light arriving from `position` towards the origin
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: [f32; 3],
    },
    Point {
        color: [f32; 3],
        intensity: f32,
        position: [f32; 3],
        /// Cutoff distance, 0 = infinite
        distance: f32,
        decay: f32,
    },
}

impl Light {
    pub fn intensity_mut(&mut self) -> &mut f32 {
        match self {
            Light::Ambient { intensity, .. }
            | Light::Directional { intensity, .. }
            | Light::Point { intensity, .. } => intensity,
        }
    }

    pub fn color_mut(&mut self) -> &mut [f32; 3] {
        match self {
            Light::Ambient { color, .. }
            | Light::Directional { color, .. }
            | Light::Point { color, .. } => color,
        }
    }

    pub fn position_mut(&mut self) -> Option<&mut [f32; 3]> {
        match self {
            Light::Ambient { .. } => None,
            Light::Directional { position, .. } | Light::Point { position, .. } => Some(position),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Light::Ambient { .. } => "Ambient Light",
            Light::Directional { .. } => "Directional Light",
            Light::Point { .. } => "Point Light",
        }
    }
}

/// Position, Euler XYZ rotation (radians) and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Debug, Clone)]
pub struct ModelPart {
    pub mesh: Arc<MeshData>,
    pub material: Material,
}

/// Renderable content of an entity
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub parts: Vec<ModelPart>,
}

impl Model {
    pub fn single(mesh: MeshData, material: Material) -> Self {
        Self {
            parts: vec![ModelPart {
                mesh: Arc::new(mesh),
                material,
            }],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.triangle_count()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub model: Model,
}

impl Entity {
    pub fn new(name: impl Into<String>, model: Model) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            visible: true,
            model,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Equirectangular radiance map in linear RGB
#[derive(Debug)]
pub struct EnvironmentMap {
    id: u64,
    pub width: u32,
    pub height: u32,
    /// RGBA32F texels, row-major, alpha = 1
    pub texels: Vec<f32>,
    /// Solid-angle weighted mean radiance, used for diffuse ambient light
    pub ambient: Vec3,
}

impl EnvironmentMap {
    pub fn new(width: u32, height: u32, texels: Vec<f32>, ambient: Vec3) -> Self {
        Self {
            id: next_resource_id(),
            width,
            height,
            texels,
            ambient,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// What an installed environment map is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentUse {
    pub background: bool,
    pub lighting: bool,
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub map: Arc<EnvironmentMap>,
    pub usage: EnvironmentUse,
}

/// Result of a finished load, applied to the scene in one step
#[derive(Debug)]
pub enum Attachment {
    /// Append-or-replace the entity in `slot`
    Entity { slot: EntityId, entity: Entity },
    Environment(Environment),
    /// Install a texture on every part of the target entity
    Texture {
        entity: EntityId,
        slot: TextureSlot,
        image: Arc<TextureImage>,
    },
}

#[derive(Debug)]
struct Slot {
    id: EntityId,
    entity: Option<Entity>,
}

/// Insertion-ordered entities plus scene-wide lighting
///
/// A slot can be reserved before its entity exists, which is how a model that
/// is still loading gets a stable id for animations and interaction.
#[derive(Debug, Default)]
pub struct SceneState {
    slots: Vec<Slot>,
    next_id: u32,
    lights: Vec<Light>,
    environment: Option<Environment>,
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an empty slot; it renders nothing until an entity is attached
    pub fn reserve(&mut self) -> EntityId {
        let id = self.allocate_id();
        self.slots.push(Slot { id, entity: None });
        id
    }

    /// Append an entity, returning its id
    pub fn add(&mut self, entity: Entity) -> EntityId {
        let id = self.allocate_id();
        self.slots.push(Slot {
            id,
            entity: Some(entity),
        });
        id
    }

    /// Apply a finished load. Returns false when the target entity of a
    /// texture is gone, in which case nothing changes.
    pub fn attach(&mut self, attachment: Attachment) -> bool {
        match attachment {
            Attachment::Entity { slot, entity } => {
                match self.slots.iter_mut().find(|s| s.id == slot) {
                    Some(existing) => existing.entity = Some(entity),
                    None => {
                        self.next_id = self.next_id.max(slot.0 + 1);
                        self.slots.push(Slot {
                            id: slot,
                            entity: Some(entity),
                        });
                    }
                }
                true
            }
            Attachment::Environment(environment) => {
                self.environment = Some(environment);
                true
            }
            Attachment::Texture {
                entity,
                slot,
                image,
            } => match self.get_mut(entity) {
                Some(target) => {
                    for part in &mut target.model.parts {
                        part.material.set_map(slot, image.clone());
                    }
                    true
                }
                None => false,
            },
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| s.entity.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .iter_mut()
            .find(|s| s.id == id)
            .and_then(|s| s.entity.as_mut())
    }

    /// Attached entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots
            .iter()
            .filter_map(|s| s.entity.as_ref().map(|e| (s.id, e)))
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Entity)> {
        self.slots
            .iter_mut()
            .filter_map(|s| s.entity.as_mut().map(|e| (s.id, e)))
    }

    /// Number of attached entities (reserved-but-empty slots don't count)
    pub fn len(&self) -> usize {
        self.entities().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Drop everything; ids keep increasing so stale handles never alias
    pub fn clear(&mut self) {
        self.slots.clear();
        self.lights.clear();
        self.environment = None;
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }
}
