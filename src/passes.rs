//! Per-frame render pass sequence.
//!
//! Every frame runs the same fixed order:
//!
//! 1. `CaptureScene`: the scene is drawn into the offscreen capture.
//! 2. `FullScreenPost`: the capture is sampled through the selected filter
//!    onto the final target.
//! 3. `PolygonPost`: post-process materials are drawn over it, sampling the
//!    capture (only when the scene has any).
//! 4. `AreaPost`: each area effect is drawn over a camera-facing quad.
//! 5. The capture is released as a shader input.
//! 6. `Overlay` then `Present`.
//!
//! A failing pass is logged and skipped; the rest of the frame still runs.

use glam::Vec3;

use crate::area::{compute_area, PostProcessArea};
use crate::camera::Camera;
use crate::capture::{CaptureImage, InputBinding, TargetBinding};
use crate::config::AreaEffectConfig;
use crate::effect_params::PassContext;
use crate::overlay::OverlayText;
use crate::post_processing::{EffectCatalog, PostProcessKind};
use crate::render_job::{RenderError, RenderPhase};
use crate::scene::Scene;
use crate::shading::{ParamValue, ParameterBlock, ParameterSink, ShaderVar, TechniqueHandle, TextureInput};
use crate::state::PostProcessState;

/// A stage of the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePass {
    CaptureScene,
    FullScreenPost,
    PolygonPost,
    /// Index into the sequencer's area effects.
    AreaPost(usize),
    Overlay,
    Present,
}

impl std::fmt::Display for FramePass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramePass::CaptureScene => write!(f, "Capture Scene"),
            FramePass::FullScreenPost => write!(f, "Full-Screen Post-Process"),
            FramePass::PolygonPost => write!(f, "Polygon Post-Process"),
            FramePass::AreaPost(i) => write!(f, "Area Post-Process #{}", i),
            FramePass::Overlay => write!(f, "Overlay"),
            FramePass::Present => write!(f, "Present"),
        }
    }
}

/// The drawing side of a frame.
///
/// `Image` is the backend's handle to the capture image. Methods that draw
/// with the capture take an [`InputBinding`], so they cannot run while the
/// capture is bound as a target.
pub trait RenderBackend {
    type Image;

    /// Clear the capture to `ambient` (and depth to far), then draw the
    /// scene's normal materials into it.
    fn capture_scene(
        &mut self,
        target: &TargetBinding<'_, Self::Image>,
        scene: &dyn Scene,
        camera: &Camera,
        ambient: [f32; 4],
    ) -> anyhow::Result<()>;

    /// Draw a 4-vertex strip onto the final target with `technique`. The quad
    /// placement and every shader value come from `params`.
    fn draw_post_process(
        &mut self,
        input: &InputBinding<'_, Self::Image>,
        technique: TechniqueHandle,
        params: &ParameterBlock,
    ) -> anyhow::Result<()>;

    /// Draw the scene's post-process materials onto the final target.
    /// `params` carries the scene texture and its size.
    fn draw_post_process_materials(
        &mut self,
        input: &InputBinding<'_, Self::Image>,
        scene: &dyn Scene,
        camera: &Camera,
        params: &ParameterBlock,
    ) -> anyhow::Result<()>;

    /// Unbind the capture from every shader input.
    fn release_scene_input(&mut self, input: InputBinding<'_, Self::Image>);

    fn draw_overlay(&mut self, items: &[OverlayText]) -> anyhow::Result<()>;

    /// Hand the final target to the display or the frame sink.
    fn present(&mut self) -> anyhow::Result<()>;
}

/// An area post-process following a scene entity.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaEffect {
    pub kind: PostProcessKind,
    pub entity: String,
    pub width: f32,
    pub height: f32,
    pub depth_offset: f32,
}

impl AreaEffect {
    pub fn from_config(config: &AreaEffectConfig) -> Result<Self, RenderError> {
        let kind = config
            .effect
            .parse::<PostProcessKind>()
            .map_err(|e| RenderError::new(RenderPhase::Initialization, e))?;
        Ok(Self {
            kind,
            entity: config.entity.clone(),
            width: config.width,
            height: config.height,
            depth_offset: config.depth_offset,
        })
    }

    /// Screen placement for this frame, or `None` if the entity is gone.
    pub fn area(&self, scene: &dyn Scene, camera: &Camera) -> Option<PostProcessArea> {
        let centre: Vec3 = scene.entity_position(&self.entity)?;
        Some(compute_area(camera, centre, self.width, self.height, self.depth_offset))
    }
}

/// What happened during one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Passes that completed, in order.
    pub executed: Vec<FramePass>,
    /// Passes that failed, with the reason.
    pub skipped: Vec<(FramePass, String)>,
    /// Number of presents (one on a normal frame).
    pub presents: usize,
}

impl FrameReport {
    fn record(&mut self, pass: FramePass, result: anyhow::Result<()>) {
        match result {
            Ok(()) => self.executed.push(pass),
            Err(e) => {
                log::error!("{} failed, skipping: {:#}", pass, e);
                self.skipped.push((pass, format!("{:#}", e)));
            }
        }
    }

    pub fn ran(&self, pass: FramePass) -> bool {
        self.executed.contains(&pass)
    }
}

/// Owns the capture image and drives the pass sequence each frame.
pub struct FrameSequencer<I> {
    catalog: EffectCatalog,
    capture: CaptureImage<I>,
    areas: Vec<AreaEffect>,
    ambient: [f32; 4],
    block: ParameterBlock,
}

impl<I> FrameSequencer<I> {
    pub fn new(catalog: EffectCatalog, capture: CaptureImage<I>, ambient: [f32; 4]) -> Self {
        Self {
            catalog,
            capture,
            areas: Vec::new(),
            ambient,
            block: ParameterBlock::new(),
        }
    }

    pub fn with_areas(mut self, areas: Vec<AreaEffect>) -> Self {
        self.areas = areas;
        self
    }

    pub fn areas(&self) -> &[AreaEffect] {
        &self.areas
    }

    pub fn capture(&self) -> &CaptureImage<I> {
        &self.capture
    }

    /// Render one frame.
    pub fn render_frame<B>(
        &mut self,
        backend: &mut B,
        state: &mut PostProcessState,
        scene: &dyn Scene,
        camera: &Camera,
    ) -> FrameReport
    where
        B: RenderBackend<Image = I>,
    {
        let mut report = FrameReport::default();
        let (width, height) = self.capture.size();
        let ctx = PassContext::new(width, height);

        {
            let target = self.capture.bind_as_target();
            let result = backend.capture_scene(&target, scene, camera, self.ambient);
            report.record(FramePass::CaptureScene, result);
        }

        let input = self.capture.bind_as_input();

        let filter = state.filter();
        prepare_pass(&mut self.block, &PostProcessArea::full_screen());
        state.params.apply(filter, &ctx, &mut self.block);
        let result = backend.draw_post_process(&input, self.catalog.technique(filter), &self.block);
        report.record(FramePass::FullScreenPost, result);

        if scene.has_post_process_materials() {
            self.block.clear();
            self.block.set_texture(ShaderVar::SceneTexture, TextureInput::SceneCapture);
            self.block.set_value(ShaderVar::SceneTextureWidth, ParamValue::Float(ctx.scene_width));
            self.block.set_value(ShaderVar::SceneTextureHeight, ParamValue::Float(ctx.scene_height));
            let result = backend.draw_post_process_materials(&input, scene, camera, &self.block);
            report.record(FramePass::PolygonPost, result);
        }

        for (i, effect) in self.areas.iter().enumerate() {
            let pass = FramePass::AreaPost(i);
            let Some(area) = effect.area(scene, camera) else {
                report.record(pass, Err(anyhow::anyhow!("entity '{}' not found", effect.entity)));
                continue;
            };
            prepare_pass(&mut self.block, &area);
            state.params.apply(effect.kind, &ctx, &mut self.block);
            let result = backend.draw_post_process(&input, self.catalog.technique(effect.kind), &self.block);
            report.record(pass, result);
        }

        backend.release_scene_input(input);

        let result = backend.draw_overlay(&state.overlay_items());
        report.record(FramePass::Overlay, result);

        let result = backend.present();
        if result.is_ok() {
            report.presents += 1;
        }
        report.record(FramePass::Present, result);

        report
    }
}

/// Reset `block` for a post-process pass over `area` sampling the capture.
fn prepare_pass(block: &mut ParameterBlock, area: &PostProcessArea) {
    block.clear();
    block.set_texture(ShaderVar::SceneTexture, TextureInput::SceneCapture);
    block.set_value(ShaderVar::AreaTopLeft, area.top_left.into());
    block.set_value(ShaderVar::AreaBottomRight, area.bottom_right.into());
    block.set_value(ShaderVar::AreaDepth, ParamValue::Float(area.depth));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_pass_sets_area() {
        let mut block = ParameterBlock::new();
        block.set_value(ShaderVar::BurnLevel, ParamValue::Float(0.5));
        prepare_pass(&mut block, &PostProcessArea::full_screen());
        assert_eq!(block.value(ShaderVar::BurnLevel), None);
        assert_eq!(block.value(ShaderVar::AreaTopLeft), Some(ParamValue::Vec2([0.0, 0.0])));
        assert_eq!(block.value(ShaderVar::AreaBottomRight), Some(ParamValue::Vec2([1.0, 1.0])));
        assert_eq!(block.float(ShaderVar::AreaDepth), 0.0);
        assert_eq!(block.texture(ShaderVar::SceneTexture), TextureInput::SceneCapture);
    }

    #[test]
    fn test_area_effect_from_config() {
        let effect = AreaEffect::from_config(&AreaEffectConfig::default()).unwrap();
        assert_eq!(effect.kind, PostProcessKind::Spiral);
        assert_eq!(effect.entity, "Cubey");

        let bad = AreaEffectConfig {
            effect: "Sparkle".to_string(),
            ..AreaEffectConfig::default()
        };
        let err = AreaEffect::from_config(&bad).unwrap_err();
        assert_eq!(err.phase, RenderPhase::Initialization);
    }

    #[test]
    fn test_frame_pass_names() {
        assert_eq!(FramePass::AreaPost(2).to_string(), "Area Post-Process #2");
        assert_eq!(FramePass::Present.to_string(), "Present");
    }
}
