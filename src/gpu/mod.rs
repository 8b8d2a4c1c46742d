pub mod mesh;
pub mod post_processor;
pub mod scene_renderer;

use crate::render_job::{RenderError, RenderPhase};

/// A headless device and queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

impl GpuContext {
    /// Request a high-performance adapter with no surface attached.
    pub async fn new_headless() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::new(RenderPhase::GpuSetup, "No suitable GPU adapter found"))?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("postfx device"),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| RenderError::with_source(RenderPhase::GpuSetup, "Failed to create device", e))?;

        Ok(Self {
            device,
            queue,
            adapter_name: format!("{} ({:?})", info.name, info.backend),
        })
    }
}
