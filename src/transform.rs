//! Model, view and projection matrices for the spinning quad.

use glam::{Mat4, Vec3};

/// A fixed perspective camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::splat(1.2),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov_y: 45.0,
            near: 1.0,
            far: 10.0,
        }
    }
}

impl Camera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y.to_radians(), aspect, self.near, self.far)
    }
}

/// The three matrices taking a local position to clip space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl Transform {
    /// Identity model matrix seen through `camera` at the given aspect ratio.
    pub fn new(camera: &Camera, aspect: f32) -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: camera.view(),
            proj: camera.projection(aspect),
        }
    }
}

/// Rotation angle in degrees, in `[0, 360)`, after `elapsed` seconds at `speed` degrees
/// per second.
pub fn rotation_degrees(elapsed: f64, speed: f32) -> f32 {
    // Reduce before narrowing so long runs keep sub-degree precision.
    (elapsed * f64::from(speed)).rem_euclid(360.0) as f32
}

/// The model matrix after `elapsed` seconds: a pure rotation about +Z through the origin.
pub fn model_rotation(elapsed: f64, speed: f32) -> Mat4 {
    Mat4::from_rotation_z(rotation_degrees(elapsed, speed).to_radians())
}
