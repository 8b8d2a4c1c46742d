//! Scene camera.
//!
//! The post-process core only ever reads the camera's matrices through
//! [`CameraMatrices`]; the host owns the camera and sets aspect ratio and
//! clip planes before each frame.
//!
//! Conventions follow glam's right-handed helpers: camera space looks down
//! -Z with +Y up, and projection maps depth to 0 (near) .. 1 (far).

use serde::{Deserialize, Serialize};

/// Read-only access to a camera's transforms.
pub trait CameraMatrices {
    /// World to camera space.
    fn view_matrix(&self) -> glam::Mat4;

    /// Camera space to clip space.
    fn projection_matrix(&self) -> glam::Mat4;

    /// Combined world to clip transform.
    fn view_projection_matrix(&self) -> glam::Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

fn default_fov() -> f32 {
    45.0
}

fn default_near() -> f32 {
    2.0
}

fn default_far() -> f32 {
    300000.0
}

fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

/// Serializable camera placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    /// Camera position in world space.
    pub position: [f32; 3],

    /// Point the camera looks at.
    pub target: [f32; 3],

    /// Up vector. Defaults to Y-up.
    #[serde(default = "default_up")]
    pub up: [f32; 3],

    /// Vertical field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,

    /// Near clip plane distance.
    #[serde(default = "default_near")]
    pub near: f32,

    /// Far clip plane distance.
    #[serde(default = "default_far")]
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [65.0, 30.0, 105.0],
            target: [0.0, 12.0, 0.0],
            up: default_up(),
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
        }
    }
}

/// A perspective look-at camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: glam::Vec3,
    pub target: glam::Vec3,
    pub up: glam::Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Camera at `position` looking at `target`, with default lens settings.
    pub fn look_at(position: glam::Vec3, target: glam::Vec3) -> Self {
        Self {
            position,
            target,
            up: glam::Vec3::Y,
            fov: default_fov(),
            aspect: 4.0 / 3.0,
            near: default_near(),
            far: default_far(),
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: glam::Vec3::from_array(config.position),
            target: glam::Vec3::from_array(config.target),
            up: glam::Vec3::from_array(config.up),
            fov: config.fov_degrees,
            aspect: 4.0 / 3.0,
            near: config.near,
            far: config.far,
        }
    }

    /// Set the viewport aspect ratio (width / height).
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Set the near and far clip plane distances.
    pub fn set_near_far_clip(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn near_far_clip(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Normalized direction from position to target.
    pub fn forward(&self) -> glam::Vec3 {
        (self.target - self.position).normalize()
    }
}

impl CameraMatrices for Camera {
    fn view_matrix(&self) -> glam::Mat4 {
        glam::Mat4::look_at_rh(self.position, self.target, self.up)
    }

    fn projection_matrix(&self) -> glam::Mat4 {
        glam::Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }
}
