//! Auxiliary post-process maps.
//!
//! Grey noise, burn and distort sample a helper texture. The maps are read
//! from a media folder when one is configured; otherwise equivalent tileable
//! maps are generated.

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::effect_params::next_unit_random;
use crate::render_job::{RenderError, RenderPhase};
use crate::shading::PostProcessMap;

/// Edge length of generated maps.
pub const MAP_SIZE: u32 = 256;

/// Cells per edge of the burn map's value-noise grid.
const BURN_CELLS: u32 = 16;

/// Load `map` from `dir`. A missing or unreadable file is a setup failure.
pub fn load_map(dir: &Path, map: PostProcessMap) -> Result<RgbaImage, RenderError> {
    let path = dir.join(map.file_name());
    let image = image::open(&path).map_err(|e| {
        RenderError::with_source(RenderPhase::TextureLoad, format!("Failed to load map {:?}", path), e)
    })?;
    log::info!("Loaded {:?} ({}x{})", path, image.width(), image.height());
    Ok(image.to_rgba8())
}

/// Generate a tileable stand-in for `map`.
pub fn generate_map(map: PostProcessMap, seed: u64) -> RgbaImage {
    match map {
        PostProcessMap::Noise => noise_map(seed),
        PostProcessMap::Burn => burn_map(seed),
        PostProcessMap::Distort => distort_map(),
    }
}

fn grey(v: f32) -> Rgba<u8> {
    let c = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([c, c, c, 255])
}

/// Independent grey value per texel.
fn noise_map(seed: u64) -> RgbaImage {
    let mut state = seed;
    RgbaImage::from_fn(MAP_SIZE, MAP_SIZE, |_, _| grey(next_unit_random(&mut state)))
}

/// Smooth value noise, so the burn front advances in soft blobs.
fn burn_map(seed: u64) -> RgbaImage {
    let mut state = seed.wrapping_add(1);
    let cells: Vec<f32> = (0..BURN_CELLS * BURN_CELLS).map(|_| next_unit_random(&mut state)).collect();
    let cell = |x: u32, y: u32| cells[((y % BURN_CELLS) * BURN_CELLS + (x % BURN_CELLS)) as usize];
    let cell_size = MAP_SIZE as f32 / BURN_CELLS as f32;

    RgbaImage::from_fn(MAP_SIZE, MAP_SIZE, |x, y| {
        let fx = x as f32 / cell_size;
        let fy = y as f32 / cell_size;
        let (cx, cy) = (fx.floor() as u32, fy.floor() as u32);
        // Smoothstep between grid values; wraps at the edge for tiling
        let tx = smooth(fx.fract());
        let ty = smooth(fy.fract());
        let top = lerp(cell(cx, cy), cell(cx + 1, cy), tx);
        let bottom = lerp(cell(cx, cy + 1), cell(cx + 1, cy + 1), tx);
        grey(lerp(top, bottom, ty))
    })
}

/// Offsets in red/green, centred on 0.5.
fn distort_map() -> RgbaImage {
    let tau = std::f32::consts::TAU;
    RgbaImage::from_fn(MAP_SIZE, MAP_SIZE, |x, y| {
        let u = x as f32 / MAP_SIZE as f32;
        let v = y as f32 / MAP_SIZE as f32;
        let dx = 0.5 + 0.5 * (tau * (3.0 * u + 2.0 * v)).sin();
        let dy = 0.5 + 0.5 * (tau * (2.0 * u - 3.0 * v)).cos();
        Rgba([(dx * 255.0).round() as u8, (dy * 255.0).round() as u8, 128, 255])
    })
}

fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
