pub mod common;

use clap::ValueEnum;
use glam::Vec3;
use std::f32::consts::PI;

use crate::config::{
    CameraConfig, ControlsConfig, EnvironmentConfig, MaterialConfig, MeshConfig, ModelConfig, RendererConfig,
    SceneConfig, Shape, TextureConfig, WindowConfig,
};
use crate::core::FrameClock;
use crate::frame_loop::{FrameLoop, Spin};
use crate::interaction::{Interaction, OrbitControls, OrbitSettings, PointerFollow, PointerFollowSettings};
use crate::loaders::{LoadRequest, TaskId};
use crate::render::PostPass;
use crate::scene::{Entity, EntityId, EnvironmentUse, Light, Model, TextureSlot, Transform};

const DRAGON_HDR: &str = "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/1k/zwartkops_curve_afternoon_1k.hdr";
const HELMET_HDR: &str = "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/1k/pond_bridge_night_1k.hdr";

/// Built-in scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Textured spinning box with studio lights
    Core,
    /// Textured box with a control panel
    Studio,
    /// glTF dragon lit by an HDR environment
    Model,
    /// Helmet with pointer-follow tilt and RGB shift
    Product,
    /// Helmet with orbit controls
    ProductOrbit,
}

impl Demo {
    pub const ALL: [Demo; 5] = [
        Demo::Core,
        Demo::Studio,
        Demo::Model,
        Demo::Product,
        Demo::ProductOrbit,
    ];

    pub fn config(self) -> SceneConfig {
        match self {
            Demo::Core => core_scene(),
            Demo::Studio => studio_scene(),
            Demo::Model => model_scene(),
            Demo::Product => product_scene(),
            Demo::ProductOrbit => product_orbit_scene(),
        }
    }
}

fn white(intensity: f32) -> [f32; 3] {
    [intensity; 3]
}

/// Ambient fill, a key light at (2, 2, 2) and a point light at the origin
fn studio_lights() -> Vec<Light> {
    vec![
        Light::Ambient {
            color: white(1.0),
            intensity: 1.0,
        },
        Light::Directional {
            color: white(1.0),
            intensity: 1.0,
            position: [2.0, 2.0, 2.0],
        },
        Light::Point {
            color: white(1.0),
            intensity: 1.0,
            position: [0.0, 0.0, 0.0],
            distance: 10.0,
            decay: 2.0,
        },
    ]
}

fn damped_orbit() -> OrbitSettings {
    OrbitSettings {
        enable_damping: true,
        damping_factor: 0.05,
        ..Default::default()
    }
}

fn core_scene() -> SceneConfig {
    SceneConfig {
        title: "Core Concepts".into(),
        camera: CameraConfig {
            fov: 65.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(0.0, 0.0, 8.0),
            target: Vec3::ZERO,
        },
        renderer: RendererConfig {
            exposure: 3.0,
            ..Default::default()
        },
        meshes: vec![MeshConfig {
            name: "cube".into(),
            shape: Shape::Box {
                width: 3.0,
                height: 3.0,
                depth: 3.0,
            },
            material: MaterialConfig {
                color: [1.0, 1.0, 1.0],
                roughness: 0.5,
                metalness: 0.5,
                emissive: [0.0, 0.0, 0.0],
                emissive_intensity: 0.5,
                opacity: 1.0,
                transparent: true,
            },
            transform: Transform::default(),
            spin: Some(Vec3::new(0.1, 0.1, 0.0)),
            textures: vec![
                TextureConfig {
                    slot: TextureSlot::Color,
                    url: "assets/textures/luffy.png".into(),
                },
                TextureConfig {
                    slot: TextureSlot::Roughness,
                    url: "assets/textures/5794.png".into(),
                },
                TextureConfig {
                    slot: TextureSlot::Normal,
                    url: "assets/textures/paper_0025_normal_1k.jpg".into(),
                },
            ],
        }],
        lights: studio_lights(),
        controls: ControlsConfig::Orbit(OrbitSettings {
            auto_rotate: true,
            enable_zoom: false,
            ..damped_orbit()
        }),
        ..Default::default()
    }
}

fn studio_scene() -> SceneConfig {
    let mut lights = vec![Light::Directional {
        color: white(1.0),
        intensity: 2.5,
        position: [10.0, 15.0, 10.0],
    }];
    lights.extend(studio_lights());

    SceneConfig {
        title: "Studio".into(),
        meshes: vec![MeshConfig {
            name: "box".into(),
            shape: Shape::Box {
                width: 2.0,
                height: 2.0,
                depth: 2.0,
            },
            material: MaterialConfig {
                roughness: 0.5,
                metalness: 0.5,
                emissive_intensity: 0.1,
                ..Default::default()
            },
            transform: Transform::default(),
            spin: None,
            textures: vec![
                TextureConfig {
                    slot: TextureSlot::Color,
                    url: "assets/textures/myPhoto1.png".into(),
                },
                TextureConfig {
                    slot: TextureSlot::Roughness,
                    url: "assets/textures/myLove.png".into(),
                },
            ],
        }],
        lights,
        controls: ControlsConfig::Orbit(OrbitSettings {
            auto_rotate: true,
            ..damped_orbit()
        }),
        panel: true,
        ..Default::default()
    }
}

fn model_scene() -> SceneConfig {
    SceneConfig {
        title: "Model".into(),
        camera: CameraConfig {
            position: Vec3::new(0.0, -1.0, 3.0),
            ..Default::default()
        },
        model: Some(ModelConfig {
            url: "assets/burning_dragon.glb".into(),
            transform: Transform::default(),
        }),
        environment: Some(EnvironmentConfig {
            url: DRAGON_HDR.into(),
            background: false,
            lighting: true,
        }),
        controls: ControlsConfig::Orbit(damped_orbit()),
        ..Default::default()
    }
}

fn helmet_scene(title: &str, camera_z: f32) -> SceneConfig {
    SceneConfig {
        title: title.into(),
        window: WindowConfig::default(),
        camera: CameraConfig {
            fov: 40.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(0.0, 0.0, camera_z),
            target: Vec3::ZERO,
        },
        model: Some(ModelConfig {
            url: "assets/DamagedHelmet/DamagedHelmet.gltf".into(),
            transform: Transform::default(),
        }),
        environment: Some(EnvironmentConfig {
            url: HELMET_HDR.into(),
            background: false,
            lighting: true,
        }),
        lights: vec![
            Light::Ambient {
                color: white(1.0),
                intensity: 1.0,
            },
            Light::Directional {
                color: white(1.0),
                intensity: 1.0,
                position: [10.0, 10.0, 10.0],
            },
        ],
        ..Default::default()
    }
}

fn product_orbit_scene() -> SceneConfig {
    SceneConfig {
        controls: ControlsConfig::Orbit(damped_orbit()),
        ..helmet_scene("Product (orbit)", 4.0)
    }
}

fn product_scene() -> SceneConfig {
    SceneConfig {
        renderer: RendererConfig {
            exposure: 3.0,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            ..Default::default()
        },
        controls: ControlsConfig::PointerFollow(PointerFollowSettings {
            range: 0.15 * PI,
            duration: 0.9,
            ..Default::default()
        }),
        post: vec![PostPass::RgbShift {
            amount: 0.003,
            angle: 0.0,
        }],
        ..helmet_scene("Product", 3.5)
    }
}

/// Handles to what [`install`] put into the scene
#[derive(Debug, Clone, Default)]
pub struct Installed {
    /// Procedural meshes in configuration order
    pub meshes: Vec<EntityId>,
    /// Reserved slot the model loads into
    pub model: Option<EntityId>,
    pub tasks: Vec<TaskId>,
}

/// Populate `frame_loop` from `config`: meshes, spins, lights, camera,
/// interaction, and background loads for textures, model and environment.
pub fn install<C: FrameClock>(config: &SceneConfig, frame_loop: &mut FrameLoop<C>) -> Installed {
    let mut installed = Installed::default();

    config.camera.apply(frame_loop.camera_mut());

    for mesh in &config.meshes {
        let data = common::build_shape(&mesh.shape);
        let entity = Entity::new(mesh.name.clone(), Model::single(data, mesh.material.to_material()))
            .with_transform(mesh.transform);
        let id = frame_loop.scene_mut().add(entity);
        installed.meshes.push(id);

        if let Some(rate) = mesh.spin {
            frame_loop.animate(
                id,
                Spin {
                    base: mesh.transform.rotation,
                    rate,
                },
            );
        }
        for texture in &mesh.textures {
            installed.tasks.push(frame_loop.load(LoadRequest::Texture {
                url: texture.url.clone(),
                entity: id,
                slot: texture.slot,
            }));
        }
    }

    for light in &config.lights {
        frame_loop.scene_mut().add_light(light.clone());
    }

    if let Some(model) = &config.model {
        let slot = frame_loop.scene_mut().reserve();
        installed.model = Some(slot);
        installed.tasks.push(frame_loop.load(LoadRequest::Model {
            url: model.url.clone(),
            slot,
            transform: model.transform,
        }));
    }

    if let Some(environment) = &config.environment {
        installed.tasks.push(frame_loop.load(LoadRequest::Environment {
            url: environment.url.clone(),
            usage: EnvironmentUse {
                background: environment.background,
                lighting: environment.lighting,
            },
        }));
    }

    let interaction = match &config.controls {
        ControlsConfig::None => Interaction::None,
        ControlsConfig::Orbit(settings) => {
            let settings = OrbitSettings {
                target: config.camera.target,
                ..settings.clone()
            };
            Interaction::Orbit(OrbitControls::new(settings, frame_loop.camera()))
        }
        ControlsConfig::PointerFollow(settings) => {
            match installed.model.or_else(|| installed.meshes.first().copied()) {
                Some(target) => Interaction::PointerFollow(PointerFollow::new(target, *settings)),
                None => {
                    log::warn!("pointer-follow configured but the scene has nothing to follow");
                    Interaction::None
                }
            }
        }
    };
    frame_loop.set_interaction(interaction);

    log::info!(
        "installed '{}': {} meshes, {} lights, {} loads",
        config.title,
        installed.meshes.len(),
        config.lights.len(),
        installed.tasks.len()
    );
    installed
}
