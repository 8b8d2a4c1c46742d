//! HSL <-> RGB colour conversion.
//!
//! HSL values use an integer percent convention: hue in whole degrees
//! (0-360), saturation and lightness in whole percent (0-100). RGB channels
//! are floats in 0.0-1.0.
//!
//! The fractional overload [`hsl_to_rgb_fractional`] rescales its 0-1 inputs
//! into the integer convention and truncates, so colours passing through it
//! are quantised to whole degrees and percent. Animated tints rely on that
//! exact stepping, so it is kept.

/// A colour in integer HSL space (degrees, percent, percent).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hsl {
    pub h: i32,
    pub s: i32,
    pub l: i32,
}

impl Hsl {
    pub fn new(h: i32, s: i32, l: i32) -> Self {
        Self { h, s, l }
    }
}

fn min3(a: f32, b: f32, c: f32) -> f32 {
    a.min(b).min(c)
}

fn max3(a: f32, b: f32, c: f32) -> f32 {
    a.max(b).max(c)
}

/// Convert an RGB colour (channels 0-1) to integer HSL.
///
/// Lightness is `50 * (max + min)`, which lands directly on the 0-100 scale.
/// Greys (`min == max`) have zero hue and saturation.
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> Hsl {
    let min = min3(r, g, b);
    let max = max3(r, g, b);

    let l = (50.0 * (max + min)) as i32;

    if min == max {
        return Hsl::new(0, 0, l);
    }

    let delta = max - min;
    let s = if l < 50 {
        (100.0 * delta / (max + min)) as i32
    } else {
        (100.0 * delta / (2.0 - max - min)) as i32
    };

    // When channels tie for the maximum, blue wins over green wins over red
    let mut h = if max == b {
        (60.0 * (r - g) / delta + 240.0) as i32
    } else if max == g {
        (60.0 * (b - r) / delta + 120.0) as i32
    } else {
        (60.0 * (g - b) / delta) as i32
    };

    if h < 0 {
        h += 360;
    }

    Hsl::new(h, s, l)
}

/// Evaluate one RGB channel from the two intermediate HSL terms.
///
/// `hue` may arrive anywhere in -1..2 after the +/-1/3 channel shift; it is
/// wrapped into 0..1 before picking one of the four linear segments.
pub fn hue_to_channel(t1: f32, t2: f32, hue: f32) -> f32 {
    let mut hue = hue;
    if hue < 0.0 {
        hue += 1.0;
    }
    if hue > 1.0 {
        hue -= 1.0;
    }

    if 6.0 * hue < 1.0 {
        return t2 + (t1 - t2) * 6.0 * hue;
    }
    if 2.0 * hue < 1.0 {
        return t1;
    }
    if 3.0 * hue < 2.0 {
        return t2 + (t1 - t2) * ((2.0 / 3.0) - hue) * 6.0;
    }
    t2
}

/// Convert an integer HSL colour to RGB channels in 0-1.
pub fn hsl_to_rgb(hsl: Hsl) -> [f32; 3] {
    let h = hsl.h as f32 / 360.0;
    let s = hsl.s as f32 / 100.0;
    let l = hsl.l as f32 / 100.0;

    if s == 0.0 {
        return [l, l, l];
    }

    let t1 = if l < 0.5 {
        l * (s + 1.0)
    } else {
        (l + s) - (l * s)
    };
    let t2 = 2.0 * l - t1;

    [
        hue_to_channel(t1, t2, h + 1.0 / 3.0),
        hue_to_channel(t1, t2, h),
        hue_to_channel(t1, t2, h - 1.0 / 3.0),
    ]
}

/// Convert HSL with every component in 0-1 to RGB.
///
/// Delegates to [`hsl_to_rgb`] after truncating to whole degrees / percent.
pub fn hsl_to_rgb_fractional(h: f32, s: f32, l: f32) -> [f32; 3] {
    hsl_to_rgb(Hsl::new((h * 360.0) as i32, (s * 100.0) as i32, (l * 100.0) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    // One degree / one percent of quantisation, plus float noise
    const TOLERANCE: f32 = 0.02;

    fn assert_rgb_close(actual: [f32; 3], expected: [f32; 3]) {
        for i in 0..3 {
            assert!(
                (actual[i] - expected[i]).abs() < TOLERANCE,
                "channel {}: {:?} vs {:?}",
                i,
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_primary_red() {
        let hsl = rgb_to_hsl(1.0, 0.0, 0.0);
        assert_eq!(hsl, Hsl::new(0, 100, 50));
        assert_rgb_close(hsl_to_rgb(hsl), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_round_trip_saturated_colours() {
        let colours = [
            [1.0, 0.5, 0.0],
            [0.2, 0.4, 0.8],
            [0.1, 0.7, 0.3],
            [0.6, 0.2, 0.5],
        ];
        for rgb in colours {
            let hsl = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
            assert!(hsl.s != 0);
            assert_rgb_close(hsl_to_rgb(hsl), rgb);
        }
    }

    #[test]
    fn test_grey_has_no_hue_or_saturation() {
        let hsl = rgb_to_hsl(0.4, 0.4, 0.4);
        assert_eq!(hsl.h, 0);
        assert_eq!(hsl.s, 0);
        assert_rgb_close(hsl_to_rgb(hsl), [0.4, 0.4, 0.4]);
    }

    #[test]
    fn test_lightness_uses_percent_scale() {
        // 50 * (max + min), not divided by two again
        let hsl = rgb_to_hsl(0.8, 0.2, 0.2);
        assert_eq!(hsl.l, 50);
    }

    #[test]
    fn test_negative_hue_wraps() {
        // Red max with blue above green gives a negative raw hue
        let hsl = rgb_to_hsl(1.0, 0.0, 0.5);
        assert_eq!(hsl.h, 330);
    }

    #[test]
    fn test_hue_to_channel_wraps_input() {
        let low = hue_to_channel(1.0, 0.0, -0.25);
        let wrapped = hue_to_channel(1.0, 0.0, 0.75);
        assert_eq!(low, wrapped);
        assert_eq!(hue_to_channel(1.0, 0.0, 1.25), hue_to_channel(1.0, 0.0, 0.25));
    }

    #[test]
    fn test_fractional_overload_truncates() {
        // 0.2505 * 360 = 90.18 -> 90 degrees, same as an exact quarter turn
        let a = hsl_to_rgb_fractional(0.2505, 1.0, 0.5);
        let b = hsl_to_rgb(Hsl::new(90, 100, 50));
        assert_eq!(a, b);
        assert_rgb_close(b, [0.5, 1.0, 0.0]);
    }
}
