//! wgpu post-process backend.
//!
//! Owns the GPU-side resources for a frame: the shared depth buffer, the
//! final target, the auxiliary maps, one pipeline per post-process technique
//! and the overlay. Every draw is recorded into its own encoder and submitted
//! straight away, so uniform writes always land before the draw that reads
//! them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use bytemuck::{Pod, Zeroable};
use image::RgbaImage;

use crate::camera::Camera;
use crate::capture::{CaptureImage, InputBinding, TargetBinding};
use crate::gpu::scene_renderer::{ScenePassTargets, SceneRenderer, DEPTH_FORMAT};
use crate::overlay::{rasterise, OverlayText};
use crate::passes::RenderBackend;
use crate::render_job::{RenderError, RenderPhase};
use crate::scene::Scene;
use crate::shading::{
    ParameterBlock, PostProcessMap, ShaderLibrary, ShaderVar, TechniqueHandle, TextureInput,
};

/// Format of the capture and the final target.
pub const COLOUR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Technique name and its fragment entry point in `shader_post.wgsl`.
const POST_TECHNIQUES: [(&str, &str); 10] = [
    ("PPCopy", "fs_copy"),
    ("PPTint", "fs_tint"),
    ("PPGreyNoise", "fs_grey_noise"),
    ("PPBurn", "fs_burn"),
    ("PPDistort", "fs_distort"),
    ("PPSpiral", "fs_spiral"),
    ("PPHeatHaze", "fs_heat_haze"),
    ("PPGaussianBlur", "fs_gaussian_blur"),
    ("PPRipple", "fs_ripple"),
    ("PPShockwave", "fs_shockwave"),
];

/// Uniform block consumed by every post-process technique.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PostUniforms {
    pub area: [f32; 4],
    pub depth_size: [f32; 4],
    pub tint: [f32; 4],
    pub noise: [f32; 4],
    pub levels: [f32; 4],
    pub ripple: [f32; 4],
    pub shockwave: [f32; 4],
}

impl PostUniforms {
    /// Pack the values in `block`. Unset variables read as zero.
    pub fn from_block(block: &ParameterBlock) -> Self {
        let vec2 = |var| block.value(var).map(|v| v.as_vec2()).unwrap_or([0.0; 2]);
        let [left, top] = vec2(ShaderVar::AreaTopLeft);
        let [right, bottom] = vec2(ShaderVar::AreaBottomRight);
        let [scale_x, scale_y] = vec2(ShaderVar::NoiseScale);
        let [offset_x, offset_y] = vec2(ShaderVar::NoiseOffset);
        let [ripple_x, ripple_y] = vec2(ShaderVar::RipplePosition);
        let tint = block
            .value(ShaderVar::TintColour)
            .map(|v| v.as_vec4())
            .unwrap_or([1.0, 1.0, 1.0, 0.0]);

        Self {
            area: [left, top, right, bottom],
            depth_size: [
                block.float(ShaderVar::AreaDepth),
                block.float(ShaderVar::SceneTextureWidth),
                block.float(ShaderVar::SceneTextureHeight),
                0.0,
            ],
            tint: [tint[0], tint[1], tint[2], 1.0],
            noise: [scale_x, scale_y, offset_x, offset_y],
            levels: [
                block.float(ShaderVar::DistortLevel),
                block.float(ShaderVar::BurnLevel),
                block.float(ShaderVar::SpiralTimer),
                block.float(ShaderVar::HeatHazeTimer),
            ],
            ripple: [block.float(ShaderVar::RippleTime), ripple_x, ripple_y, 0.0],
            shockwave: [
                block.float(ShaderVar::ShockwaveScale),
                block.float(ShaderVar::ShockwaveSin),
                0.0,
                0.0,
            ],
        }
    }
}

/// The capture image as wgpu sees it.
pub struct CaptureTextures {
    pub view: wgpu::TextureView,
    pub texture: wgpu::Texture,
}

struct MapTexture {
    view: wgpu::TextureView,
    _texture: wgpu::Texture,
}

/// Row pitch of a readback copy, padded to the copy alignment.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded + (align - unpadded % align) % align
}

fn create_colour_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOUR_FORMAT,
        usage,
        view_formats: &[],
    })
}

fn write_rgba(queue: &wgpu::Queue, texture: &wgpu::Texture, pixels: &[u8], width: u32, height: u32) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Reject target sizes the device cannot create.
fn check_target_size(width: u32, height: u32, max_dimension: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 || width > max_dimension || height > max_dimension {
        return Err(RenderError::new(
            RenderPhase::GpuSetup,
            format!(
                "Target size {}x{} is outside the device limit of 1..={} per side",
                width, height, max_dimension
            ),
        ));
    }
    Ok(())
}

/// Every post-process map must be supplied.
fn check_maps(maps: &[(PostProcessMap, RgbaImage)]) -> Result<(), RenderError> {
    for map in PostProcessMap::ALL {
        if !maps.iter().any(|(supplied, _)| *supplied == map) {
            return Err(RenderError::new(
                RenderPhase::TextureLoad,
                format!("Post-process map {} missing", map.file_name()),
            ));
        }
    }
    Ok(())
}

/// The error popped from a validation scope, as a result.
fn scope_result(phase: RenderPhase, what: &str, error: Option<wgpu::Error>) -> Result<(), RenderError> {
    match error {
        Some(error) => Err(RenderError::with_source(
            phase,
            format!("{} failed GPU validation", what),
            error,
        )),
        None => Ok(()),
    }
}

/// GPU post-process backend.
///
/// Fields drop in declaration order, so resources created last are declared
/// first and the device goes last.
pub struct PostProcessor {
    pending_frame: Option<PathBuf>,
    readback_buffer: wgpu::Buffer,
    overlay_pipeline: wgpu::RenderPipeline,
    overlay_bind_group: wgpu::BindGroup,
    overlay_texture: wgpu::Texture,
    post_pipelines: Vec<wgpu::RenderPipeline>,
    technique_index: HashMap<&'static str, usize>,
    uniform_bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    texture_layout: wgpu::BindGroupLayout,
    maps: HashMap<PostProcessMap, MapTexture>,
    map_sampler: wgpu::Sampler,
    scene_sampler: wgpu::Sampler,
    scene_renderer: SceneRenderer,
    depth_view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    final_view: wgpu::TextureView,
    final_texture: wgpu::Texture,
    width: u32,
    height: u32,
    queue: wgpu::Queue,
    device: wgpu::Device,
}

impl PostProcessor {
    /// Build every pipeline and upload `maps`.
    ///
    /// Target sizes the device cannot hold and missing maps are rejected
    /// before any GPU work. Validation failures while creating targets
    /// surface as `GpuSetup`, and while building pipelines as `ShaderCompile`.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        width: u32,
        height: u32,
        maps: &[(PostProcessMap, RgbaImage)],
    ) -> Result<Self, RenderError> {
        check_target_size(width, height, device.limits().max_texture_dimension_2d)?;
        check_maps(maps)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let final_texture = create_colour_texture(
            &device,
            "Final Target",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let final_view = final_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Buffer"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let overlay_texture = create_colour_texture(
            &device,
            "Overlay Texture",
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let overlay_view = overlay_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded_bytes_per_row(width) as wgpu::BufferAddress * height as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut map_textures = HashMap::new();
        for (map, image) in maps {
            let texture = create_colour_texture(
                &device,
                map.file_name(),
                image.width(),
                image.height(),
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            );
            write_rgba(&queue, &texture, image.as_raw(), image.width(), image.height());
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            map_textures.insert(*map, MapTexture { view, _texture: texture });
        }

        let targets_error = pollster::block_on(device.pop_error_scope());
        scope_result(RenderPhase::GpuSetup, "Render target creation", targets_error)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let scene_renderer = SceneRenderer::new(&device, COLOUR_FORMAT);

        let scene_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Scene Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let map_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Map Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Texture Bind Group Layout"),
            entries: &[texture_entry(0), texture_entry(1), sampler_entry(2), sampler_entry(3)],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Post Uniform Buffer"),
            size: std::mem::size_of::<PostUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let post_shader = device.create_shader_module(wgpu::include_wgsl!("shader_post.wgsl"));
        let post_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Post Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let mut post_pipelines = Vec::with_capacity(POST_TECHNIQUES.len());
        let mut technique_index = HashMap::new();
        for (i, &(technique, fs_entry)) in POST_TECHNIQUES.iter().enumerate() {
            post_pipelines.push(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(technique),
                layout: Some(&post_layout),
                vertex: wgpu::VertexState {
                    module: &post_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &post_shader,
                    entry_point: Some(fs_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOUR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                // Area quads are hidden by scene geometry in front of them
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            }));
            technique_index.insert(technique, i);
        }

        let overlay_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay Bind Group Layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let overlay_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Bind Group"),
            layout: &overlay_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&overlay_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&scene_sampler),
                },
            ],
        });
        let overlay_shader = device.create_shader_module(wgpu::include_wgsl!("shader_overlay.wgsl"));
        let overlay_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&overlay_layout],
            push_constant_ranges: &[],
        });
        let overlay_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Pipeline"),
            layout: Some(&overlay_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &overlay_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &overlay_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOUR_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let shader_error = pollster::block_on(device.pop_error_scope());
        scope_result(RenderPhase::ShaderCompile, "Post-process shader", shader_error)?;

        log::info!(
            "Post-processor ready: {}x{}, {} techniques, {} maps",
            width,
            height,
            post_pipelines.len(),
            map_textures.len()
        );

        Ok(Self {
            pending_frame: None,
            readback_buffer,
            overlay_pipeline,
            overlay_bind_group,
            overlay_texture,
            post_pipelines,
            technique_index,
            uniform_bind_group,
            uniform_buffer,
            texture_layout,
            maps: map_textures,
            map_sampler,
            scene_sampler,
            scene_renderer,
            depth_view,
            _depth_texture: depth_texture,
            final_view,
            final_texture,
            width,
            height,
            queue,
            device,
        })
    }

    /// Create the offscreen capture image at the target size.
    pub fn create_capture(&self) -> CaptureImage<CaptureTextures> {
        let texture = create_colour_texture(
            &self.device,
            "Scene Capture",
            self.width,
            self.height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        CaptureImage::new(CaptureTextures { view, texture }, self.width, self.height)
    }

    /// Save the next presented frame to `path`.
    pub fn request_frame(&mut self, path: PathBuf) {
        self.pending_frame = Some(path);
    }

    fn map_view(&self, input: TextureInput) -> Option<&wgpu::TextureView> {
        let map = match input {
            TextureInput::Map(map) => map,
            // Techniques without a map never sample it
            _ => PostProcessMap::Noise,
        };
        self.maps.get(&map).map(|texture| &texture.view)
    }

    /// Run one pass inside a validation scope, so GPU errors come back as
    /// `Err` instead of reaching the device's uncaptured-error handler.
    fn validated<T>(&self, what: &str, pass: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = pass(self);
        let error = pollster::block_on(self.device.pop_error_scope());
        scope_result(RenderPhase::FrameRender, what, error)?;
        result
    }

    fn save_frame(&self, path: &Path) -> Result<(), RenderError> {
        let padded = padded_bytes_per_row(self.width);
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.final_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = self.readback_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::with_source(RenderPhase::FrameSave, "Readback channel closed", e))?
            .map_err(|e| RenderError::with_source(RenderPhase::FrameSave, "Failed to map readback buffer", e))?;

        let row_bytes = (self.width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * self.height as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in 0..self.height as usize {
                let start = row * padded as usize;
                pixels.extend_from_slice(&data[start..start + row_bytes]);
            }
        }
        self.readback_buffer.unmap();

        image::save_buffer(path, &pixels, self.width, self.height, image::ColorType::Rgba8).map_err(|e| {
            RenderError::with_source(RenderPhase::FrameSave, format!("Failed to write {:?}", path), e)
        })?;
        log::debug!("Saved {:?}", path);
        Ok(())
    }
}

impl ShaderLibrary for PostProcessor {
    fn technique_by_name(&self, name: &str) -> Option<TechniqueHandle> {
        self.technique_index.get(name).map(|&i| TechniqueHandle(i))
    }

    /// Every variable is a field of [`PostUniforms`] or a texture binding.
    fn has_variable(&self, name: &str) -> bool {
        ShaderVar::ALL.iter().any(|var| var.name() == name)
    }
}

impl PostProcessor {
    fn encode_capture(
        &self,
        target: &TargetBinding<'_, CaptureTextures>,
        scene: &dyn Scene,
        camera: &Camera,
        ambient: [f32; 4],
    ) -> Result<()> {
        let targets = ScenePassTargets {
            colour: &target.resource().view,
            depth: &self.depth_view,
            clear: Some(ambient),
            scene_input: None,
        };
        self.scene_renderer.render(
            &self.device,
            &self.queue,
            &targets,
            &scene.render_list(false),
            camera,
            &scene.lights(),
            ambient,
        )
    }

    fn encode_post_process(
        &self,
        input: &InputBinding<'_, CaptureTextures>,
        technique: TechniqueHandle,
        params: &ParameterBlock,
    ) -> Result<()> {
        let pipeline = self
            .post_pipelines
            .get(technique.0)
            .ok_or_else(|| anyhow!("unknown technique {:?}", technique))?;
        if params.texture(ShaderVar::SceneTexture) != TextureInput::SceneCapture {
            bail!("scene texture is not bound");
        }

        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&PostUniforms::from_block(params)),
        );

        let map_view = self
            .map_view(params.texture(ShaderVar::PostProcessMap))
            .ok_or_else(|| anyhow!("post-process map not loaded"))?;

        let texture_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.resource().view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(map_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.scene_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.map_sampler),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Post-Process Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Post-Process Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.final_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &texture_bind_group, &[]);
            render_pass.draw(0..4, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn encode_materials(
        &self,
        input: &InputBinding<'_, CaptureTextures>,
        scene: &dyn Scene,
        camera: &Camera,
        params: &ParameterBlock,
    ) -> Result<()> {
        if params.texture(ShaderVar::SceneTexture) != TextureInput::SceneCapture {
            bail!("scene texture is not bound");
        }
        let scene_size = [
            params.float(ShaderVar::SceneTextureWidth),
            params.float(ShaderVar::SceneTextureHeight),
        ];
        let targets = ScenePassTargets {
            colour: &self.final_view,
            depth: &self.depth_view,
            clear: None,
            scene_input: Some((&input.resource().view, scene_size)),
        };
        self.scene_renderer.render(
            &self.device,
            &self.queue,
            &targets,
            &scene.render_list(true),
            camera,
            &scene.lights(),
            [0.0; 4],
        )
    }

    fn encode_overlay(&self, items: &[OverlayText]) -> Result<()> {
        let pixels = rasterise(items, self.width, self.height);
        write_rgba(&self.queue, &self.overlay_texture, &pixels, self.width, self.height);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Overlay Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.final_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.overlay_pipeline);
            render_pass.set_bind_group(0, &self.overlay_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

impl RenderBackend for PostProcessor {
    type Image = CaptureTextures;

    fn capture_scene(
        &mut self,
        target: &TargetBinding<'_, CaptureTextures>,
        scene: &dyn Scene,
        camera: &Camera,
        ambient: [f32; 4],
    ) -> Result<()> {
        self.validated("Scene capture", |pp| pp.encode_capture(target, scene, camera, ambient))
    }

    fn draw_post_process(
        &mut self,
        input: &InputBinding<'_, CaptureTextures>,
        technique: TechniqueHandle,
        params: &ParameterBlock,
    ) -> Result<()> {
        self.validated("Post-process", |pp| pp.encode_post_process(input, technique, params))
    }

    fn draw_post_process_materials(
        &mut self,
        input: &InputBinding<'_, CaptureTextures>,
        scene: &dyn Scene,
        camera: &Camera,
        params: &ParameterBlock,
    ) -> Result<()> {
        self.validated("Post-process materials", |pp| pp.encode_materials(input, scene, camera, params))
    }

    fn release_scene_input(&mut self, input: InputBinding<'_, CaptureTextures>) {
        // Bind groups referencing the capture are per-draw and already dropped
        drop(input);
    }

    fn draw_overlay(&mut self, items: &[OverlayText]) -> Result<()> {
        self.validated("Overlay", |pp| pp.encode_overlay(items))
    }

    fn present(&mut self) -> Result<()> {
        if let Some(path) = self.pending_frame.take() {
            self.validated("Frame readback", |pp| Ok(pp.save_frame(&path)?))?;
        }
        Ok(())
    }
}
