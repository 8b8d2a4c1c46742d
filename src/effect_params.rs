//! Animated post-process parameters.
//!
//! [`EffectParams`] holds the state behind every post-process: timers that
//! accumulate, levels that wrap or decay, and the values recomputed on every
//! pass (random noise offsets, the tint converted from HSL). `advance` runs
//! once per tick before rendering; `apply` runs once per pass.

use crate::colour;
use crate::post_processing::PostProcessKind;
use crate::shading::{ParamValue, ParameterSink, ShaderVar, TextureInput};

/// Burn level increase per second (wraps at 1).
pub const BURN_SPEED: f32 = 0.2;
/// Spiral timer increase per second.
pub const SPIRAL_SPEED: f32 = 1.0;
/// Heat haze timer increase per second.
pub const HEAT_HAZE_SPEED: f32 = 1.0;
/// Tint hue increase per second (wraps at 1).
pub const TINT_HUE_SPEED: f32 = 0.1;
/// Shockwave scale decrease per second.
pub const SHOCKWAVE_DECAY: f32 = 1.5;
/// Shockwave phase increase per tick. Not scaled by the tick length.
pub const SHOCKWAVE_PHASE_STEP: f32 = 0.20;
/// Fixed distortion strength.
pub const DISTORT_LEVEL: f32 = 0.03;
/// Fineness of the grey noise grain, in pixels.
pub const NOISE_GRAIN_SIZE: f32 = 140.0;

/// Tint saturation and lightness; only the hue animates.
const TINT_SATURATION: f32 = 1.0;
const TINT_LIGHTNESS: f32 = 0.5;

/// Per-pass information the parameters depend on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassContext {
    /// Scene texture size in pixels.
    pub scene_width: f32,
    pub scene_height: f32,
}

impl PassContext {
    pub fn new(scene_width: u32, scene_height: u32) -> Self {
        Self {
            scene_width: scene_width as f32,
            scene_height: scene_height as f32,
        }
    }
}

/// State for every post-process kind.
#[derive(Clone, Debug)]
pub struct EffectParams {
    /// Burn progress, 0..1.
    pub burn_level: f32,
    pub spiral_timer: f32,
    pub heat_haze_timer: f32,
    /// Tint hue, 0..1.
    pub tint_hue: f32,
    /// Seconds since the ripple was last activated.
    pub ripple_time: f32,
    /// Pointer position (pixels) captured at ripple activation.
    pub ripple_position: glam::Vec2,
    pub shockwave_scale: f32,
    pub shockwave_phase: f32,
    rng_state: u64,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self::new(0)
    }
}

impl EffectParams {
    /// Fresh state; `seed` drives the noise offsets.
    pub fn new(seed: u64) -> Self {
        Self {
            burn_level: 0.0,
            spiral_timer: 0.0,
            heat_haze_timer: 0.0,
            tint_hue: 0.0,
            ripple_time: 0.0,
            ripple_position: glam::Vec2::ZERO,
            shockwave_scale: 1.0,
            shockwave_phase: 0.0,
            rng_state: seed,
        }
    }

    /// Advance every time-driven value by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        for kind in PostProcessKind::ALL {
            (kind.entry().advance)(self, dt);
        }
    }

    /// Push the values for `kind` into `sink` for the next pass.
    pub fn apply(&mut self, kind: PostProcessKind, ctx: &PassContext, sink: &mut dyn ParameterSink) {
        sink.set_value(ShaderVar::SceneTextureWidth, ParamValue::Float(ctx.scene_width));
        sink.set_value(ShaderVar::SceneTextureHeight, ParamValue::Float(ctx.scene_height));
        (kind.entry().apply)(self, ctx, sink);
    }

    /// Restart the animation of `kind`, as when its key is pressed.
    ///
    /// Ripple restarts from the current pointer position; Shockwave restarts
    /// at full scale. Other kinds have nothing to reset.
    pub fn activate(&mut self, kind: PostProcessKind, pointer: glam::Vec2) {
        match kind {
            PostProcessKind::Ripple => {
                self.ripple_time = 0.0;
                self.ripple_position = pointer;
            }
            PostProcessKind::Shockwave => {
                self.shockwave_scale = 1.0;
                self.shockwave_phase = 0.0;
            }
            _ => {}
        }
    }

    /// Tint as RGB, via the quantising fractional HSL conversion.
    pub fn tint_colour(&self) -> [f32; 3] {
        colour::hsl_to_rgb_fractional(self.tint_hue, TINT_SATURATION, TINT_LIGHTNESS)
    }

    fn next_random(&mut self) -> f32 {
        next_unit_random(&mut self.rng_state)
    }
}

/// Xorshift step returning a uniform value in [0, 1). A zero state is reseeded.
pub(crate) fn next_unit_random(state: &mut u64) -> f32 {
    if *state == 0 {
        *state = 0x5DEECE66D;
    }
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    // Top 24 bits keep the result strictly below 1.0 in f32
    (*state >> 40) as f32 / (1u64 << 24) as f32
}

pub(crate) fn advance_none(_params: &mut EffectParams, _dt: f32) {}

pub(crate) fn advance_burn(params: &mut EffectParams, dt: f32) {
    params.burn_level = (params.burn_level + BURN_SPEED * dt).rem_euclid(1.0);
}

pub(crate) fn advance_spiral(params: &mut EffectParams, dt: f32) {
    params.spiral_timer += SPIRAL_SPEED * dt;
}

pub(crate) fn advance_heat_haze(params: &mut EffectParams, dt: f32) {
    params.heat_haze_timer += HEAT_HAZE_SPEED * dt;
}

pub(crate) fn advance_tint(params: &mut EffectParams, dt: f32) {
    params.tint_hue = (params.tint_hue + TINT_HUE_SPEED * dt).rem_euclid(1.0);
}

pub(crate) fn advance_ripple(params: &mut EffectParams, dt: f32) {
    params.ripple_time += dt;
}

pub(crate) fn advance_shockwave(params: &mut EffectParams, dt: f32) {
    params.shockwave_scale = (params.shockwave_scale - SHOCKWAVE_DECAY * dt).max(0.0);
    params.shockwave_phase += SHOCKWAVE_PHASE_STEP;
}

pub(crate) fn apply_none(_params: &mut EffectParams, _ctx: &PassContext, _sink: &mut dyn ParameterSink) {}

pub(crate) fn apply_tint(params: &mut EffectParams, _ctx: &PassContext, sink: &mut dyn ParameterSink) {
    sink.set_value(ShaderVar::TintColour, ParamValue::Vec3(params.tint_colour()));
}

pub(crate) fn apply_grey_noise(params: &mut EffectParams, ctx: &PassContext, sink: &mut dyn ParameterSink) {
    let scale = [ctx.scene_width / NOISE_GRAIN_SIZE, ctx.scene_height / NOISE_GRAIN_SIZE];
    sink.set_value(ShaderVar::NoiseScale, ParamValue::Vec2(scale));

    // New offset every pass gives the moving static
    let offset = [params.next_random(), params.next_random()];
    sink.set_value(ShaderVar::NoiseOffset, ParamValue::Vec2(offset));

    sink.set_texture(ShaderVar::PostProcessMap, map_input(PostProcessKind::GreyNoise));
}

pub(crate) fn apply_burn(params: &mut EffectParams, _ctx: &PassContext, sink: &mut dyn ParameterSink) {
    sink.set_value(ShaderVar::BurnLevel, ParamValue::Float(params.burn_level));
    sink.set_texture(ShaderVar::PostProcessMap, map_input(PostProcessKind::Burn));
}

pub(crate) fn apply_distort(_params: &mut EffectParams, _ctx: &PassContext, sink: &mut dyn ParameterSink) {
    sink.set_value(ShaderVar::DistortLevel, ParamValue::Float(DISTORT_LEVEL));
    sink.set_texture(ShaderVar::PostProcessMap, map_input(PostProcessKind::Distort));
}

pub(crate) fn apply_spiral(params: &mut EffectParams, _ctx: &PassContext, sink: &mut dyn ParameterSink) {
    let amount = (1.0 - params.spiral_timer.cos()) * 4.0;
    sink.set_value(ShaderVar::SpiralTimer, ParamValue::Float(amount));
}

pub(crate) fn apply_heat_haze(params: &mut EffectParams, _ctx: &PassContext, sink: &mut dyn ParameterSink) {
    sink.set_value(ShaderVar::HeatHazeTimer, ParamValue::Float(params.heat_haze_timer));
}

pub(crate) fn apply_ripple(params: &mut EffectParams, _ctx: &PassContext, sink: &mut dyn ParameterSink) {
    sink.set_value(ShaderVar::RippleTime, ParamValue::Float(params.ripple_time));
    sink.set_value(ShaderVar::RipplePosition, params.ripple_position.into());
}

pub(crate) fn apply_shockwave(params: &mut EffectParams, _ctx: &PassContext, sink: &mut dyn ParameterSink) {
    let wave = params.shockwave_phase.sin() * params.shockwave_scale;
    sink.set_value(ShaderVar::ShockwaveSin, ParamValue::Float(wave));
    sink.set_value(ShaderVar::ShockwaveScale, ParamValue::Float(params.shockwave_scale));
}

fn map_input(kind: PostProcessKind) -> TextureInput {
    kind.map().map(TextureInput::Map).unwrap_or(TextureInput::Unbound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::{ParameterBlock, PostProcessMap};

    const EPSILON: f32 = 1e-5;

    fn ctx() -> PassContext {
        PassContext::new(1280, 720)
    }

    #[test]
    fn test_burn_level_wraps() {
        let mut params = EffectParams::new(1);
        params.burn_level = 0.9;
        params.advance(1.0);
        assert!((params.burn_level - 0.1).abs() < EPSILON, "{}", params.burn_level);

        // A tick long enough to wrap several times still lands in [0, 1)
        params.advance(12.0);
        assert!(params.burn_level >= 0.0 && params.burn_level < 1.0);
        assert!((params.burn_level - 0.5).abs() < 1e-4, "{}", params.burn_level);
    }

    #[test]
    fn test_tint_hue_wraps() {
        let mut params = EffectParams::new(1);
        params.advance(2.5);
        assert!((params.tint_hue - 0.25).abs() < EPSILON);

        let mut params = EffectParams::new(1);
        params.advance(12.0);
        assert!((params.tint_hue - 0.2).abs() < 1e-4, "{}", params.tint_hue);
    }

    #[test]
    fn test_timers_accumulate_without_wrapping() {
        let mut params = EffectParams::new(1);
        for _ in 0..100 {
            params.advance(0.1);
        }
        assert!((params.spiral_timer - 10.0).abs() < 1e-3);
        assert!((params.heat_haze_timer - 10.0).abs() < 1e-3);
        assert!((params.ripple_time - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_shockwave_scale_decays_to_zero() {
        let mut params = EffectParams::new(1);
        for _ in 0..200 {
            params.advance(0.016);
            assert!(params.shockwave_scale >= 0.0);
        }
        assert_eq!(params.shockwave_scale, 0.0);
        params.advance(0.016);
        assert_eq!(params.shockwave_scale, 0.0);
    }

    #[test]
    fn test_shockwave_phase_is_per_tick() {
        let mut short = EffectParams::new(1);
        let mut long = EffectParams::new(1);
        short.advance(0.001);
        long.advance(1.0);
        assert_eq!(short.shockwave_phase, SHOCKWAVE_PHASE_STEP);
        assert_eq!(long.shockwave_phase, SHOCKWAVE_PHASE_STEP);
    }

    #[test]
    fn test_activation_resets() {
        let mut params = EffectParams::new(1);
        params.advance(0.5);
        params.activate(PostProcessKind::Ripple, glam::Vec2::new(320.0, 200.0));
        assert_eq!(params.ripple_time, 0.0);
        assert_eq!(params.ripple_position, glam::Vec2::new(320.0, 200.0));
        assert!(params.shockwave_scale < 1.0);

        params.activate(PostProcessKind::Shockwave, glam::Vec2::ZERO);
        assert_eq!(params.shockwave_scale, 1.0);
        assert_eq!(params.shockwave_phase, 0.0);
        // Ripple position untouched by another kind's activation
        assert_eq!(params.ripple_position, glam::Vec2::new(320.0, 200.0));
    }

    #[test]
    fn test_apply_sets_scene_size_for_every_kind() {
        let mut params = EffectParams::new(1);
        for kind in PostProcessKind::ALL {
            let mut block = ParameterBlock::new();
            params.apply(kind, &ctx(), &mut block);
            assert_eq!(block.float(ShaderVar::SceneTextureWidth), 1280.0);
            assert_eq!(block.float(ShaderVar::SceneTextureHeight), 720.0);
        }
    }

    #[test]
    fn test_apply_binds_maps() {
        let mut params = EffectParams::new(1);
        let mut block = ParameterBlock::new();
        params.apply(PostProcessKind::Burn, &ctx(), &mut block);
        assert_eq!(block.texture(ShaderVar::PostProcessMap), TextureInput::Map(PostProcessMap::Burn));

        let mut block = ParameterBlock::new();
        params.apply(PostProcessKind::Distort, &ctx(), &mut block);
        assert_eq!(block.float(ShaderVar::DistortLevel), DISTORT_LEVEL);
        assert_eq!(block.texture(ShaderVar::PostProcessMap), TextureInput::Map(PostProcessMap::Distort));

        let mut block = ParameterBlock::new();
        params.apply(PostProcessKind::Copy, &ctx(), &mut block);
        assert_eq!(block.texture(ShaderVar::PostProcessMap), TextureInput::Unbound);
    }

    #[test]
    fn test_grey_noise_offset_changes_every_apply() {
        let mut params = EffectParams::new(7);
        let mut first = ParameterBlock::new();
        let mut second = ParameterBlock::new();
        params.apply(PostProcessKind::GreyNoise, &ctx(), &mut first);
        params.apply(PostProcessKind::GreyNoise, &ctx(), &mut second);

        let a = first.value(ShaderVar::NoiseOffset).unwrap().as_vec2();
        let b = second.value(ShaderVar::NoiseOffset).unwrap().as_vec2();
        assert_ne!(a, b);
        for v in a.iter().chain(b.iter()) {
            assert!(*v >= 0.0 && *v < 1.0);
        }

        let scale = first.value(ShaderVar::NoiseScale).unwrap().as_vec2();
        assert!((scale[0] - 1280.0 / 140.0).abs() < EPSILON);
        assert!((scale[1] - 720.0 / 140.0).abs() < EPSILON);
    }

    #[test]
    fn test_spiral_uses_cosine_curve() {
        let mut params = EffectParams::new(1);
        params.spiral_timer = std::f32::consts::PI;
        let mut block = ParameterBlock::new();
        params.apply(PostProcessKind::Spiral, &ctx(), &mut block);
        assert!((block.float(ShaderVar::SpiralTimer) - 8.0).abs() < EPSILON);
    }

    #[test]
    fn test_shockwave_apply_scales_sine() {
        let mut params = EffectParams::new(1);
        params.shockwave_phase = std::f32::consts::FRAC_PI_2;
        params.shockwave_scale = 0.5;
        let mut block = ParameterBlock::new();
        params.apply(PostProcessKind::Shockwave, &ctx(), &mut block);
        assert!((block.float(ShaderVar::ShockwaveSin) - 0.5).abs() < EPSILON);
        assert_eq!(block.float(ShaderVar::ShockwaveScale), 0.5);
    }

    #[test]
    fn test_tint_colour_from_hue() {
        let mut params = EffectParams::new(1);
        let mut block = ParameterBlock::new();
        params.apply(PostProcessKind::Tint, &ctx(), &mut block);
        // Hue 0 is pure red
        let rgb = block.value(ShaderVar::TintColour).unwrap().as_vec4();
        assert!((rgb[0] - 1.0).abs() < EPSILON);
        assert!(rgb[1].abs() < EPSILON);
        assert!(rgb[2].abs() < EPSILON);
    }

    #[test]
    fn test_next_unit_random_range_and_zero_seed() {
        let mut state = 0;
        let first = next_unit_random(&mut state);
        assert_ne!(state, 0);
        let mut values = vec![first];
        values.extend((0..1000).map(|_| next_unit_random(&mut state)));
        assert!(values.iter().all(|v| (0.0..1.0).contains(v)));
        assert!(values.windows(2).any(|w| w[0] != w[1]));

        // Same seed, same sequence
        let (mut a, mut b) = (42, 42);
        assert_eq!(next_unit_random(&mut a), next_unit_random(&mut b));
    }
}
