//! Scene geometry rendering.
//!
//! Two material paths share one shader module: the lit path draws into the
//! scene capture, the glass path draws post-process materials onto the final
//! target while sampling the capture.

use anyhow::{bail, Result};
use bytemuck::{Pod, Zeroable};

use crate::camera::{Camera, CameraMatrices};
use crate::gpu::mesh::{GpuMesh, Vertex};
use crate::scene::{Material, MeshType, PointLight, Renderable};

/// Per-draw uniforms are packed at this stride (the uniform offset alignment).
const DRAW_STRIDE: u64 = 256;

/// Upper bound on draws in one scene pass.
pub const MAX_DRAWS: usize = 64;

const MAX_LIGHTS: usize = 2;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    light_pos: [[f32; 4]; MAX_LIGHTS],
    light_colour: [[f32; 4]; MAX_LIGHTS],
}

impl FrameUniforms {
    fn new(camera: &Camera, lights: &[PointLight], ambient: [f32; 4]) -> Self {
        let mut uniforms = Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            ambient,
            light_pos: [[0.0; 4]; MAX_LIGHTS],
            light_colour: [[0.0; 4]; MAX_LIGHTS],
        };
        for (i, light) in lights.iter().take(MAX_LIGHTS).enumerate() {
            uniforms.light_pos[i] = light.position.extend(1.0).to_array();
            let [r, g, b] = light.colour;
            uniforms.light_colour[i] = [r, g, b, light.brightness];
        }
        uniforms
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DrawUniforms {
    world: [[f32; 4]; 4],
    colour: [f32; 4],
    /// Distortion, scene width, scene height, unused.
    params: [f32; 4],
}

impl DrawUniforms {
    fn new(renderable: &Renderable, scene_size: [f32; 2]) -> Self {
        let (colour, distortion) = match renderable.material {
            Material::Lit { colour } => (colour, 0.0),
            Material::Glass { tint, distortion } => (tint, distortion),
        };
        Self {
            world: renderable.world.to_cols_array_2d(),
            colour,
            params: [distortion, scene_size[0], scene_size[1], 0.0],
        }
    }
}

/// What a scene pass draws into and, for post-process materials, samples.
pub struct ScenePassTargets<'a> {
    pub colour: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    /// Clear colour; `None` keeps the target's contents.
    pub clear: Option<[f32; 4]>,
    /// Captured scene and its size, for post-process materials.
    pub scene_input: Option<(&'a wgpu::TextureView, [f32; 2])>,
}

pub struct SceneRenderer {
    lit_pipeline: wgpu::RenderPipeline,
    glass_pipeline: wgpu::RenderPipeline,
    frame_bind_group: wgpu::BindGroup,
    frame_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    scene_texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    cube: GpuMesh,
    plane: GpuMesh,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, colour_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("shader_scene.wgsl"));

        let uniform_entry = |has_dynamic_offset: bool| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset,
                min_binding_size: None,
            },
            count: None,
        };

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Frame Bind Group Layout"),
            entries: &[uniform_entry(false)],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Draw Bind Group Layout"),
            entries: &[uniform_entry(true)],
        });
        let scene_texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Draw Uniform Buffer"),
            size: DRAW_STRIDE * MAX_DRAWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Draw Bind Group"),
            layout: &draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });

        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lit Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });
        let glass_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Glass Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout, &scene_texture_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |label: &str, layout: &wgpu::PipelineLayout, fs_entry: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::desc()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: colour_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let lit_pipeline = create_pipeline("Lit Pipeline", &lit_layout, "fs_lit");
        let glass_pipeline = create_pipeline("Glass Pipeline", &glass_layout, "fs_glass");

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Scene Capture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            lit_pipeline,
            glass_pipeline,
            frame_bind_group,
            frame_buffer,
            draw_bind_group,
            draw_buffer,
            scene_texture_layout,
            sampler,
            cube: GpuMesh::new(device, MeshType::Cube),
            plane: GpuMesh::new(device, MeshType::Plane),
        }
    }

    fn mesh(&self, mesh: MeshType) -> &GpuMesh {
        match mesh {
            MeshType::Cube => &self.cube,
            MeshType::Plane => &self.plane,
        }
    }

    /// Draw `renderables` in one pass and submit it.
    ///
    /// Lit materials use the lit path; post-process materials need
    /// `targets.scene_input`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: &ScenePassTargets<'_>,
        renderables: &[Renderable],
        camera: &Camera,
        lights: &[PointLight],
        ambient: [f32; 4],
    ) -> Result<()> {
        if renderables.len() > MAX_DRAWS {
            bail!("{} draws exceeds the limit of {}", renderables.len(), MAX_DRAWS);
        }
        let needs_scene = renderables.iter().any(|r| r.material.is_post_process());
        if needs_scene && targets.scene_input.is_none() {
            bail!("post-process material drawn without the scene capture bound");
        }

        let scene_size = targets.scene_input.map(|(_, size)| size).unwrap_or([0.0, 0.0]);
        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniforms::new(camera, lights, ambient)),
        );
        for (i, renderable) in renderables.iter().enumerate() {
            queue.write_buffer(
                &self.draw_buffer,
                i as u64 * DRAW_STRIDE,
                bytemuck::bytes_of(&DrawUniforms::new(renderable, scene_size)),
            );
        }

        let scene_bind_group = targets.scene_input.map(|(view, _)| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Scene Capture Bind Group"),
                layout: &self.scene_texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        });

        let colour_load = match targets.clear {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = if targets.clear.is_some() {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: targets.colour,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: colour_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (i, renderable) in renderables.iter().enumerate() {
                if renderable.material.is_post_process() {
                    render_pass.set_pipeline(&self.glass_pipeline);
                    if let Some(bind_group) = &scene_bind_group {
                        render_pass.set_bind_group(2, bind_group, &[]);
                    }
                } else {
                    render_pass.set_pipeline(&self.lit_pipeline);
                }
                let offset = (i as u64 * DRAW_STRIDE) as wgpu::DynamicOffset;
                render_pass.set_bind_group(1, &self.draw_bind_group, &[offset]);

                let mesh = self.mesh(renderable.mesh);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        queue.submit(Some(encoder.finish()));
        Ok(())
    }
}
