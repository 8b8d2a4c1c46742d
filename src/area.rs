//! Placement of post-process areas on screen.
//!
//! An area post-process renders a camera-facing quad around a world-space
//! point. The quad is described to the shaders in UV space (0-1, y down) plus
//! a single depth-buffer value, so the post-process vertex shader can build
//! the quad itself without any vertex buffer.

use glam::{Vec2, Vec3, Vec4};

use crate::camera::CameraMatrices;

/// Screen rectangle and depth for one post-process pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostProcessArea {
    /// Top-left corner in UV space.
    pub top_left: Vec2,
    /// Bottom-right corner in UV space.
    pub bottom_right: Vec2,
    /// Depth-buffer value the quad is drawn at.
    pub depth: f32,
}

impl PostProcessArea {
    /// The whole viewport, drawn in front of everything.
    pub fn full_screen() -> Self {
        Self {
            top_left: Vec2::new(0.0, 0.0),
            bottom_right: Vec2::new(1.0, 1.0),
            depth: 0.0,
        }
    }

    /// Centre of the rectangle in UV space.
    pub fn centre(&self) -> Vec2 {
        (self.top_left + self.bottom_right) * 0.5
    }

    /// Width and height in UV units.
    pub fn size(&self) -> Vec2 {
        self.bottom_right - self.top_left
    }
}

/// Compute the camera-facing area around `centre`.
///
/// `width` and `height` are in world units. `depth_offset` pulls the effect
/// towards the camera (negative) or pushes it into the scene (positive). The
/// offset is added to clip-space z and w before the divide, which is an
/// approximation of moving the point along the view axis; it is close enough
/// for small areas away from the edges of the view.
pub fn compute_area(
    camera: &impl CameraMatrices,
    centre: Vec3,
    width: f32,
    height: f32,
    depth_offset: f32,
) -> PostProcessArea {
    let camera_centre = camera.view_matrix() * centre.extend(1.0);

    // Camera space is y-up, so the rectangle faces the camera with no rotation
    let camera_top_left = camera_centre + Vec4::new(-width / 2.0, height / 2.0, 0.0, 0.0);
    let camera_bottom_right = camera_top_left + Vec4::new(width, -height, 0.0, 0.0);

    let projection = camera.projection_matrix();
    let mut proj_top_left = projection * camera_top_left;
    let proj_bottom_right = projection * camera_bottom_right;

    let ndc_top_left = Vec2::new(proj_top_left.x, proj_top_left.y) / proj_top_left.w;
    let ndc_bottom_right = Vec2::new(proj_bottom_right.x, proj_bottom_right.y) / proj_bottom_right.w;

    proj_top_left.z += depth_offset;
    proj_top_left.w += depth_offset;
    let depth = proj_top_left.z / proj_top_left.w;

    PostProcessArea {
        top_left: ndc_to_uv(ndc_top_left),
        bottom_right: ndc_to_uv(ndc_bottom_right),
        depth,
    }
}

/// Map normalised device coordinates (-1..1, y up) to UV space (0..1, y down).
pub fn ndc_to_uv(ndc: Vec2) -> Vec2 {
    Vec2::new(ndc.x / 2.0 + 0.5, -ndc.y / 2.0 + 0.5)
}
