use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::camera::PerspectiveCamera;

const POLAR_EPSILON: f32 = 1e-6;
const MIN_DAMPING: f32 = 1e-3;
const MAX_DAMPING: f32 = 0.999;

/// Orbit control parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub enable_damping: bool,
    /// Fraction of the pending rotation applied per update, in (0, 1)
    pub damping_factor: f32,
    pub auto_rotate: bool,
    /// Auto-rotate speed; 2.0 is one turn every 30 seconds
    pub auto_rotate_speed: f32,
    pub enable_zoom: bool,
    pub zoom_speed: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub target: Vec3,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            enable_damping: false,
            damping_factor: 0.05,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            enable_zoom: true,
            zoom_speed: 1.0,
            rotate_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::MAX,
            target: Vec3::ZERO,
        }
    }
}

/// Camera orbit around a fixed target with optional damping and auto-rotate
#[derive(Debug, Clone)]
pub struct OrbitControls {
    settings: OrbitSettings,
    radius: f32,
    /// Azimuth around +Y, 0 = looking down -Z from +Z
    theta: f32,
    /// Polar angle from +Y
    phi: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl OrbitControls {
    /// Start orbiting from the camera's current position
    pub fn new(settings: OrbitSettings, camera: &PerspectiveCamera) -> Self {
        let settings = Self::sanitize(settings);
        let offset = camera.position - settings.target;
        let radius = offset.length();
        let (theta, phi) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI / 2.0)
        };

        Self {
            settings,
            radius,
            theta,
            phi,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    fn sanitize(mut settings: OrbitSettings) -> OrbitSettings {
        if !(settings.damping_factor > 0.0 && settings.damping_factor < 1.0) {
            let clamped = if settings.damping_factor.is_nan() {
                OrbitSettings::default().damping_factor
            } else {
                settings.damping_factor.clamp(MIN_DAMPING, MAX_DAMPING)
            };
            log::warn!(
                "damping factor {} outside (0, 1), using {}",
                settings.damping_factor,
                clamped
            );
            settings.damping_factor = clamped;
        }
        settings.min_distance = settings.min_distance.max(0.0);
        if settings.max_distance < settings.min_distance {
            settings.max_distance = settings.min_distance;
        }
        settings
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    pub fn azimuth(&self) -> f32 {
        self.theta
    }

    pub fn polar(&self) -> f32 {
        self.phi
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Pointer drag in logical pixels over a surface `height` pixels tall
    pub fn on_drag(&mut self, dx: f32, dy: f32, height: f32) {
        if height <= 0.0 {
            return;
        }
        self.rotate_left(TAU * dx / height * self.settings.rotate_speed);
        self.rotate_up(TAU * dy / height * self.settings.rotate_speed);
    }

    /// Positive notches zoom in
    pub fn on_wheel(&mut self, notches: f32) {
        if !self.settings.enable_zoom || notches == 0.0 {
            return;
        }
        let step = 0.95_f32.powf(self.settings.zoom_speed);
        if notches > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    /// Advance one frame and place the camera. Returns true if the camera moved.
    pub fn update(&mut self, dt: f32, camera: &mut PerspectiveCamera) -> bool {
        if self.settings.auto_rotate {
            self.rotate_left(TAU / 60.0 * self.settings.auto_rotate_speed * dt);
        }

        let before = (self.theta, self.phi, self.radius);

        if self.settings.enable_damping {
            let factor = self.settings.damping_factor;
            self.theta += self.delta_theta * factor;
            self.phi += self.delta_phi * factor;
        } else {
            self.theta += self.delta_theta;
            self.phi += self.delta_phi;
        }

        self.phi = self.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.radius = (self.radius * self.scale).clamp(self.settings.min_distance, self.settings.max_distance);

        let sin_phi_radius = self.phi.sin() * self.radius;
        let offset = Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        );
        camera.position = self.settings.target + offset;
        camera.look_at(self.settings.target);

        if self.settings.enable_damping {
            let keep = 1.0 - self.settings.damping_factor;
            self.delta_theta *= keep;
            self.delta_phi *= keep;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        before != (self.theta, self.phi, self.radius)
    }
}
