//! On-screen diagnostic text.
//!
//! Text is laid out as [`OverlayText`] items and rasterised on the CPU into
//! an RGBA image with a transparent background, which the backend blends over
//! the final target after all post-processing.

use font8x8::legacy::BASIC_LEGACY;

use crate::post_processing::PostProcessKind;

const GLYPH_SIZE: u32 = 8;

/// Integer upscale applied to the 8x8 glyphs.
pub const GLYPH_SCALE: u32 = 2;

/// Height of one text line in pixels.
pub const LINE_HEIGHT: u32 = GLYPH_SIZE * GLYPH_SCALE;

const SHADOW_OFFSET: u32 = 2;
const SHADOW_COLOUR: [u8; 4] = [0, 0, 0, 255];
const STATS_COLOUR: [u8; 4] = [255, 255, 0, 255];
const NAME_COLOUR: [u8; 4] = [255, 255, 255, 255];

/// A block of text at a pixel position. Lines are split on '\n'.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayText {
    pub text: String,
    pub x: u32,
    pub y: u32,
    pub colour: [u8; 4],
}

impl OverlayText {
    pub fn new(text: impl Into<String>, x: u32, y: u32, colour: [u8; 4]) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            colour,
        }
    }
}

/// Frame statistics and the active filter name.
///
/// Statistics only appear once an average frame time is available; they are
/// drawn with a drop shadow.
pub fn overlay_items(average_frame_time: Option<f32>, filter: PostProcessKind) -> Vec<OverlayText> {
    let mut items = Vec::new();
    if let Some(frame_time) = average_frame_time.filter(|t| *t > 0.0) {
        let stats = format!("Frame Time: {:.2}ms\nFPS:{:.1}", frame_time * 1000.0, 1.0 / frame_time);
        items.push(OverlayText::new(stats.clone(), SHADOW_OFFSET, SHADOW_OFFSET, SHADOW_COLOUR));
        items.push(OverlayText::new(stats, 0, 0, STATS_COLOUR));
    }
    items.push(OverlayText::new(
        format!("Fullscreen Post-Process: {}", filter.label()),
        0,
        LINE_HEIGHT * 2,
        NAME_COLOUR,
    ));
    items
}

fn glyph_for_char(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

/// Rasterise `items` in order into a `width` x `height` RGBA8 image.
/// Later items draw over earlier ones; text past the edges is clipped.
pub fn rasterise(items: &[OverlayText], width: u32, height: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; (width * height * 4) as usize];

    for item in items {
        for (row, line) in item.text.lines().enumerate() {
            let line_y = item.y + row as u32 * LINE_HEIGHT;
            for (col, ch) in line.chars().enumerate() {
                let glyph = glyph_for_char(ch);
                let glyph_x = item.x + col as u32 * GLYPH_SIZE * GLYPH_SCALE;
                if glyph_x >= width {
                    break;
                }
                for (y_offset, bits) in glyph.iter().enumerate() {
                    for x_bit in 0..GLYPH_SIZE {
                        if (bits >> x_bit) & 0x01 == 0 {
                            continue;
                        }
                        for sy in 0..GLYPH_SCALE {
                            let y = line_y + y_offset as u32 * GLYPH_SCALE + sy;
                            if y >= height {
                                continue;
                            }
                            for sx in 0..GLYPH_SCALE {
                                let x = glyph_x + x_bit * GLYPH_SCALE + sx;
                                if x >= width {
                                    continue;
                                }
                                let idx = ((y * width + x) * 4) as usize;
                                pixels[idx..idx + 4].copy_from_slice(&item.colour);
                            }
                        }
                    }
                }
            }
        }
    }

    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(pixels: &[u8], width: u32, x: u32, y: u32) -> u8 {
        pixels[((y * width + x) * 4 + 3) as usize]
    }

    #[test]
    fn test_items_without_average() {
        let items = overlay_items(None, PostProcessKind::HeatHaze);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Fullscreen Post-Process: Heat Haze");
    }

    #[test]
    fn test_items_with_average() {
        let items = overlay_items(Some(0.02), PostProcessKind::Copy);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].colour, SHADOW_COLOUR);
        assert_eq!(items[1].text, "Frame Time: 20.00ms\nFPS:50.0");
        assert_eq!((items[0].x, items[0].y), (2, 2));
        // Name is drawn below the two statistics lines
        assert_eq!(items[2].y, LINE_HEIGHT * 2);
    }

    #[test]
    fn test_rasterise_draws_glyphs() {
        let items = vec![OverlayText::new("H", 0, 0, [255, 0, 0, 255])];
        let pixels = rasterise(&items, 32, 32);
        assert_eq!(pixels.len(), 32 * 32 * 4);
        let lit = pixels.chunks(4).filter(|p| p[3] == 255).count();
        assert!(lit > 0);
        // Nothing outside the scaled glyph cell
        assert_eq!(alpha_at(&pixels, 32, 20, 20), 0);
    }

    #[test]
    fn test_space_is_empty_and_text_clips() {
        let pixels = rasterise(&[OverlayText::new(" ", 0, 0, [255; 4])], 16, 16);
        assert!(pixels.iter().all(|b| *b == 0));

        // Starts past the right edge: clipped, no panic
        let pixels = rasterise(&[OverlayText::new("ABC", 30, 30, [255; 4])], 32, 32);
        assert_eq!(pixels.len(), 32 * 32 * 4);
    }
}
