use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::scene::MeshType;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const fn new(pos: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position: pos, normal }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12, // [f32; 3] is 12 bytes
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Unit cube centred on the origin, four vertices per face so normals stay flat.
pub fn create_cube_geometry() -> (Vec<Vertex>, Vec<u16>) {
    const FRONT: [f32; 3] = [0.0, 0.0, 1.0];
    const BACK: [f32; 3] = [0.0, 0.0, -1.0];
    const TOP: [f32; 3] = [0.0, 1.0, 0.0];
    const BOTTOM: [f32; 3] = [0.0, -1.0, 0.0];
    const RIGHT: [f32; 3] = [1.0, 0.0, 0.0];
    const LEFT: [f32; 3] = [-1.0, 0.0, 0.0];

    let vertices = vec![
        Vertex::new([-0.5, -0.5, 0.5], FRONT),
        Vertex::new([0.5, -0.5, 0.5], FRONT),
        Vertex::new([0.5, 0.5, 0.5], FRONT),
        Vertex::new([-0.5, 0.5, 0.5], FRONT),
        Vertex::new([-0.5, -0.5, -0.5], BACK),
        Vertex::new([-0.5, 0.5, -0.5], BACK),
        Vertex::new([0.5, 0.5, -0.5], BACK),
        Vertex::new([0.5, -0.5, -0.5], BACK),
        Vertex::new([-0.5, 0.5, -0.5], TOP),
        Vertex::new([-0.5, 0.5, 0.5], TOP),
        Vertex::new([0.5, 0.5, 0.5], TOP),
        Vertex::new([0.5, 0.5, -0.5], TOP),
        Vertex::new([-0.5, -0.5, -0.5], BOTTOM),
        Vertex::new([0.5, -0.5, -0.5], BOTTOM),
        Vertex::new([0.5, -0.5, 0.5], BOTTOM),
        Vertex::new([-0.5, -0.5, 0.5], BOTTOM),
        Vertex::new([0.5, -0.5, -0.5], RIGHT),
        Vertex::new([0.5, 0.5, -0.5], RIGHT),
        Vertex::new([0.5, 0.5, 0.5], RIGHT),
        Vertex::new([0.5, -0.5, 0.5], RIGHT),
        Vertex::new([-0.5, -0.5, -0.5], LEFT),
        Vertex::new([-0.5, -0.5, 0.5], LEFT),
        Vertex::new([-0.5, 0.5, 0.5], LEFT),
        Vertex::new([-0.5, 0.5, -0.5], LEFT),
    ];

    let indices = vec![
        0, 1, 2, 2, 3, 0, // Front
        4, 5, 6, 6, 7, 4, // Back
        8, 9, 10, 10, 11, 8, // Top
        12, 13, 14, 14, 15, 12, // Bottom
        16, 17, 18, 18, 19, 16, // Right
        20, 21, 22, 22, 23, 20, // Left
    ];

    (vertices, indices)
}

/// Unit plane in the XZ plane facing +Y, centred on the origin.
pub fn create_plane_geometry() -> (Vec<Vertex>, Vec<u16>) {
    const UP: [f32; 3] = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-0.5, 0.0, -0.5], UP),
        Vertex::new([0.5, 0.0, -0.5], UP),
        Vertex::new([0.5, 0.0, 0.5], UP),
        Vertex::new([-0.5, 0.0, 0.5], UP),
    ];

    // Counter-clockwise seen from above
    let indices = vec![0, 2, 1, 0, 3, 2];

    (vertices, indices)
}

/// Geometry uploaded to the GPU.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, mesh: MeshType) -> Self {
        let (vertices, indices) = match mesh {
            MeshType::Cube => create_cube_geometry(),
            MeshType::Plane => create_plane_geometry(),
        };
        let label = format!("{:?}", mesh);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(v: &[Vertex], tri: &[u16]) -> glam::Vec3 {
        let a = glam::Vec3::from_array(v[tri[0] as usize].position);
        let b = glam::Vec3::from_array(v[tri[1] as usize].position);
        let c = glam::Vec3::from_array(v[tri[2] as usize].position);
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn test_winding_matches_normals() {
        for (vertices, indices) in [create_cube_geometry(), create_plane_geometry()] {
            for tri in indices.chunks(3) {
                let winding = face_normal(&vertices, tri);
                let stored = glam::Vec3::from_array(vertices[tri[0] as usize].normal);
                assert!(winding.dot(stored) > 0.99, "triangle {:?}", tri);
            }
        }
    }
}
