use glam::{Mat4, Vec3};

/// Perspective camera looking at a target point
///
/// The aspect ratio is owned by the viewport: it is derived from the output
/// surface and only the viewport writes it. The projection matrix is cached
/// and must be refreshed with [`PerspectiveCamera::update_projection_matrix`]
/// after any projection parameter changes.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    aspect: f32,
    projection: Mat4,
    projection_aspect: f32,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            near,
            far,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect,
            projection: Mat4::IDENTITY,
            projection_aspect: aspect,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub(crate) fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Recompute the cached projection from fov/aspect/near/far
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
        self.projection_aspect = self.aspect;
    }

    /// Cached projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Aspect ratio the cached projection was built with
    pub fn projection_aspect(&self) -> f32 {
        self.projection_aspect
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }
}
