// cli.rs - Command-line interface configuration
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::{EnvironmentConfig, ModelConfig, SceneConfig};
use crate::scenes::Demo;

#[derive(Parser, Debug, Clone)]
#[command(name = "scene-loop")]
#[command(about = "Real-time 3D scene viewer", long_about = None)]
pub struct Cli {
    /// Built-in scene to run
    #[arg(long, value_enum, default_value_t = Demo::Product)]
    pub demo: Demo,

    /// Scene configuration file (JSON); replaces --demo
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Load this glTF/GLB model instead of the scene's own
    #[arg(long)]
    pub model: Option<String>,

    /// Environment map (HDR) for lighting
    #[arg(long)]
    pub environment: Option<String>,

    /// Cap on device pixel density for the output surface
    #[arg(long)]
    pub max_pixel_ratio: Option<f32>,

    /// Disable UI elements
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,

    /// Print the resolved scene configuration as JSON and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl Cli {
    /// The scene to run: the config file or preset, with flag overrides applied
    pub fn scene_config(&self) -> Result<SceneConfig> {
        let mut config = match &self.config {
            Some(path) => SceneConfig::load(path)?,
            None => self.demo.config(),
        };

        if let Some(url) = &self.model {
            let transform = config.model.as_ref().map(|m| m.transform).unwrap_or_default();
            config.model = Some(ModelConfig {
                url: url.clone(),
                transform,
            });
        }
        if let Some(url) = &self.environment {
            let background = config.environment.as_ref().is_some_and(|e| e.background);
            config.environment = Some(EnvironmentConfig {
                url: url.clone(),
                background,
                lighting: true,
            });
        }
        if let Some(ratio) = self.max_pixel_ratio {
            config.renderer.max_pixel_ratio = ratio;
        }
        if self.no_ui {
            config.panel = false;
        }
        Ok(config)
    }
}
