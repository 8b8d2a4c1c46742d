//! End-to-end frame sequencing against a recording backend.

use glam::{Mat4, Vec2, Vec3};

use postfx::camera::{Camera, CameraConfig};
use postfx::capture::{CaptureImage, CaptureState, InputBinding, TargetBinding};
use postfx::overlay::OverlayText;
use postfx::passes::{AreaEffect, FramePass, FrameSequencer, RenderBackend};
use postfx::post_processing::{EffectCatalog, PostProcessKind};
use postfx::scene::{DemoScene, Material, MeshType, PointLight, Renderable, Scene};
use postfx::shading::{ParamValue, ParameterBlock, ShaderLibrary, ShaderVar, TechniqueHandle, TextureInput};
use postfx::state::PostProcessState;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

struct FakeLibrary;

impl ShaderLibrary for FakeLibrary {
    fn technique_by_name(&self, name: &str) -> Option<TechniqueHandle> {
        PostProcessKind::ALL
            .iter()
            .position(|k| k.technique_name() == name)
            .map(TechniqueHandle)
    }

    fn has_variable(&self, _name: &str) -> bool {
        true
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Capture { ambient: [f32; 4] },
    Post { technique: TechniqueHandle, block: ParameterBlock, input_state: CaptureState },
    Materials { block: ParameterBlock },
    Release,
    Overlay { lines: Vec<String> },
    Present,
}

#[derive(Default)]
struct RecordingBackend {
    calls: Vec<Call>,
    fail_full_screen: bool,
}

impl RecordingBackend {
    fn posts(&self) -> Vec<(TechniqueHandle, ParameterBlock)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Post { technique, block, .. } => Some((*technique, block.clone())),
                _ => None,
            })
            .collect()
    }

    fn position(&self, wanted: fn(&Call) -> bool) -> usize {
        self.calls.iter().position(wanted).expect("call not recorded")
    }
}

impl RenderBackend for RecordingBackend {
    type Image = ();

    fn capture_scene(
        &mut self,
        _target: &TargetBinding<'_, ()>,
        _scene: &dyn Scene,
        _camera: &Camera,
        ambient: [f32; 4],
    ) -> anyhow::Result<()> {
        self.calls.push(Call::Capture { ambient });
        Ok(())
    }

    fn draw_post_process(
        &mut self,
        input: &InputBinding<'_, ()>,
        technique: TechniqueHandle,
        params: &ParameterBlock,
    ) -> anyhow::Result<()> {
        let full_screen = params.value(ShaderVar::AreaBottomRight) == Some(ParamValue::Vec2([1.0, 1.0]))
            && params.value(ShaderVar::AreaTopLeft) == Some(ParamValue::Vec2([0.0, 0.0]));
        if full_screen && self.fail_full_screen {
            anyhow::bail!("technique rejected");
        }
        self.calls.push(Call::Post {
            technique,
            block: params.clone(),
            input_state: input.state(),
        });
        Ok(())
    }

    fn draw_post_process_materials(
        &mut self,
        _input: &InputBinding<'_, ()>,
        _scene: &dyn Scene,
        _camera: &Camera,
        params: &ParameterBlock,
    ) -> anyhow::Result<()> {
        self.calls.push(Call::Materials { block: params.clone() });
        Ok(())
    }

    fn release_scene_input(&mut self, input: InputBinding<'_, ()>) {
        assert_eq!(input.state(), CaptureState::Input);
        self.calls.push(Call::Release);
    }

    fn draw_overlay(&mut self, items: &[OverlayText]) -> anyhow::Result<()> {
        self.calls.push(Call::Overlay {
            lines: items.iter().map(|i| i.text.clone()).collect(),
        });
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.calls.push(Call::Present);
        Ok(())
    }
}

/// One lit cube and nothing with a post-process material.
struct PlainScene;

impl Scene for PlainScene {
    fn update_all(&mut self, _dt: f32) {}

    fn render_list(&self, post_process_materials_only: bool) -> Vec<Renderable> {
        if post_process_materials_only {
            return Vec::new();
        }
        vec![Renderable {
            mesh: MeshType::Cube,
            world: Mat4::IDENTITY,
            material: Material::Lit {
                colour: [1.0, 1.0, 1.0, 1.0],
            },
        }]
    }

    fn entity_position(&self, name: &str) -> Option<Vec3> {
        (name == "Cube").then_some(Vec3::ZERO)
    }

    fn lights(&self) -> Vec<PointLight> {
        Vec::new()
    }
}

fn camera() -> Camera {
    let mut camera = Camera::from_config(&CameraConfig::default());
    camera.set_aspect(WIDTH as f32 / HEIGHT as f32);
    camera
}

fn sequencer(areas: Vec<AreaEffect>) -> FrameSequencer<()> {
    let catalog = EffectCatalog::resolve(&FakeLibrary).unwrap();
    FrameSequencer::new(catalog, CaptureImage::new((), WIDTH, HEIGHT), [0.3, 0.3, 0.4, 1.0]).with_areas(areas)
}

fn spiral_on(entity: &str) -> AreaEffect {
    AreaEffect {
        kind: PostProcessKind::Spiral,
        entity: entity.to_string(),
        width: 20.0,
        height: 20.0,
        depth_offset: -9.0,
    }
}

#[test]
fn test_copy_frame() {
    let mut scene = PlainScene;
    let mut state = PostProcessState::new(PostProcessKind::Copy, 1);
    let mut backend = RecordingBackend::default();
    let mut sequencer = sequencer(Vec::new());

    state.update(0.016, &mut scene);
    let report = sequencer.render_frame(&mut backend, &mut state, &scene, &camera());

    assert_eq!(
        report.executed,
        vec![FramePass::CaptureScene, FramePass::FullScreenPost, FramePass::Overlay, FramePass::Present]
    );
    assert!(report.skipped.is_empty());
    assert_eq!(report.presents, 1);

    assert_eq!(backend.calls[0], Call::Capture { ambient: [0.3, 0.3, 0.4, 1.0] });
    let posts = backend.posts();
    assert_eq!(posts.len(), 1);
    let (technique, block) = &posts[0];
    assert_eq!(*technique, TechniqueHandle(PostProcessKind::Copy.index()));
    assert_eq!(block.texture(ShaderVar::SceneTexture), TextureInput::SceneCapture);
    assert_eq!(block.float(ShaderVar::AreaDepth), 0.0);
    assert_eq!(block.float(ShaderVar::SceneTextureWidth), WIDTH as f32);
    assert_eq!(block.float(ShaderVar::SceneTextureHeight), HEIGHT as f32);

    // No frame-time average yet, so only the filter name is drawn
    let overlay = backend.calls.iter().find_map(|c| match c {
        Call::Overlay { lines } => Some(lines.clone()),
        _ => None,
    });
    assert_eq!(overlay, Some(vec!["Fullscreen Post-Process: Copy".to_string()]));
}

#[test]
fn test_pass_order_with_materials_and_areas() {
    let mut scene = DemoScene::new();
    let mut state = PostProcessState::new(PostProcessKind::Tint, 1);
    let mut backend = RecordingBackend::default();
    let mut sequencer = sequencer(vec![spiral_on("Cubey")]);

    state.update(0.016, &mut scene);
    let report = sequencer.render_frame(&mut backend, &mut state, &scene, &camera());

    assert_eq!(
        report.executed,
        vec![
            FramePass::CaptureScene,
            FramePass::FullScreenPost,
            FramePass::PolygonPost,
            FramePass::AreaPost(0),
            FramePass::Overlay,
            FramePass::Present,
        ]
    );

    let materials = backend.position(|c| matches!(c, Call::Materials { .. }));
    let release = backend.position(|c| matches!(c, Call::Release));
    let overlay = backend.position(|c| matches!(c, Call::Overlay { .. }));
    assert!(materials < release);
    assert!(release < overlay);
    assert_eq!(backend.calls.last(), Some(&Call::Present));

    let Some(Call::Materials { block }) = backend.calls.get(materials) else {
        panic!("expected a materials call");
    };
    assert_eq!(block.texture(ShaderVar::SceneTexture), TextureInput::SceneCapture);
    assert_eq!(block.float(ShaderVar::SceneTextureWidth), WIDTH as f32);

    // Every pass sampling the capture saw it bound as an input
    for call in &backend.calls {
        if let Call::Post { input_state, .. } = call {
            assert_eq!(*input_state, CaptureState::Input);
        }
    }

    let posts = backend.posts();
    assert_eq!(posts.len(), 2);
    let (technique, block) = &posts[1];
    assert_eq!(*technique, TechniqueHandle(PostProcessKind::Spiral.index()));
    let top_left = block.value(ShaderVar::AreaTopLeft).unwrap().as_vec2();
    let bottom_right = block.value(ShaderVar::AreaBottomRight).unwrap().as_vec2();
    assert!(top_left[0] < bottom_right[0]);
    assert!(top_left[1] < bottom_right[1]);
    // The full-screen tint values do not leak into the area pass
    assert_eq!(block.value(ShaderVar::TintColour), None);
}

#[test]
fn test_capture_idle_after_frame() {
    let scene = DemoScene::new();
    let mut state = PostProcessState::new(PostProcessKind::Copy, 1);
    let mut backend = RecordingBackend::default();
    let mut sequencer = sequencer(vec![spiral_on("Cubey")]);

    for _ in 0..3 {
        sequencer.render_frame(&mut backend, &mut state, &scene, &camera());
        assert_eq!(sequencer.capture().state(), CaptureState::Idle);
    }
    let presents = backend.calls.iter().filter(|c| **c == Call::Present).count();
    assert_eq!(presents, 3);
}

#[test]
fn test_failed_pass_is_skipped() {
    let scene = PlainScene;
    let mut state = PostProcessState::new(PostProcessKind::Burn, 1);
    let mut backend = RecordingBackend {
        fail_full_screen: true,
        ..Default::default()
    };
    let mut sequencer = sequencer(vec![spiral_on("Cube")]);

    let report = sequencer.render_frame(&mut backend, &mut state, &scene, &camera());

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, FramePass::FullScreenPost);
    assert!(report.skipped[0].1.contains("technique rejected"));
    assert!(report.ran(FramePass::AreaPost(0)));
    assert!(report.ran(FramePass::Overlay));
    assert_eq!(report.presents, 1);
}

#[test]
fn test_missing_area_entity_is_skipped() {
    let scene = DemoScene::new();
    let mut state = PostProcessState::new(PostProcessKind::Copy, 1);
    let mut backend = RecordingBackend::default();
    let mut sequencer = sequencer(vec![spiral_on("Nobody"), spiral_on("Cubey")]);

    let report = sequencer.render_frame(&mut backend, &mut state, &scene, &camera());

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, FramePass::AreaPost(0));
    assert!(report.skipped[0].1.contains("Nobody"));
    assert!(report.ran(FramePass::AreaPost(1)));
    assert_eq!(report.presents, 1);
}

#[test]
fn test_tint_follows_elapsed_time() {
    let mut scene = DemoScene::new();
    let mut state = PostProcessState::new(PostProcessKind::Tint, 1);
    let mut backend = RecordingBackend::default();
    let mut sequencer = sequencer(Vec::new());

    state.update(2.5, &mut scene);
    sequencer.render_frame(&mut backend, &mut state, &scene, &camera());
    assert!((state.params.tint_hue - 0.25).abs() < 1e-5);

    let expected = state.params.tint_colour();
    let (technique, block) = &backend.posts()[0];
    assert_eq!(*technique, TechniqueHandle(PostProcessKind::Tint.index()));
    assert_eq!(block.value(ShaderVar::TintColour), Some(ParamValue::Vec3(expected)));

    state.update(9.5, &mut scene);
    assert!((state.params.tint_hue - 0.2).abs() < 1e-4);
}

#[test]
fn test_ripple_key_restarts_from_pointer() {
    let mut scene = PlainScene;
    let mut state = PostProcessState::new(PostProcessKind::Copy, 1);
    let mut backend = RecordingBackend::default();
    let mut sequencer = sequencer(Vec::new());

    state.update(1.0, &mut scene);
    state.pointer = Vec2::new(200.0, 120.0);
    state.select_filter(PostProcessKind::Ripple);
    state.update(0.5, &mut scene);
    sequencer.render_frame(&mut backend, &mut state, &scene, &camera());

    let (_, block) = &backend.posts()[0];
    assert!((block.float(ShaderVar::RippleTime) - 0.5).abs() < 1e-6);
    assert_eq!(block.value(ShaderVar::RipplePosition), Some(ParamValue::Vec2([200.0, 120.0])));
}
