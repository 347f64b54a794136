/// Fixed per-bar colors, assigned once at startup from a hue gradient.
/// Mirrored bar indices land on the same hue, so the gradient reads as
/// symmetric around the center of the overlay.

use egui::Color32;

use crate::spectrum::POINTS;

/// Build the per-bar color table: hue sweeps |-0.5 + i / n| with fixed
/// saturation and lightness of 0.5
pub fn bar_colors() -> Vec<Color32> {
    let col_point = 1.0 / POINTS as f64;
    (0..POINTS)
        .map(|i| {
            let hue = (-0.5 + col_point * i as f64).abs();
            let (r, g, b) = hsl_to_rgb(hue, 0.5, 0.5);
            Color32::from_rgb(r, g, b)
        })
        .collect()
}

/// HSL to RGB, all inputs in [0, 1]
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let r = hue_to_channel(p, q, h + 1.0 / 3.0);
    let g = hue_to_channel(p, q, h);
    let b = hue_to_channel(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

// ========== Tests ============

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_saturation_is_gray() {
        assert_eq!(hsl_to_rgb(0.3, 0.0, 0.5), (128, 128, 128));
        assert_eq!(hsl_to_rgb(0.9, 0.0, 0.0), (0, 0, 0));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
    }

    #[test]
    fn test_known_hues() {
        // Half-saturated, half-lit red
        assert_eq!(hsl_to_rgb(0.0, 0.5, 0.5), (191, 64, 64));
        // Green third of the wheel
        assert_eq!(hsl_to_rgb(1.0 / 3.0, 0.5, 0.5), (64, 191, 64));
        // Blue third
        assert_eq!(hsl_to_rgb(2.0 / 3.0, 0.5, 0.5), (64, 64, 191));
    }

    #[test]
    fn test_gradient_covers_all_bars() {
        let colors = bar_colors();
        assert_eq!(colors.len(), POINTS);
    }

    #[test]
    fn test_gradient_is_symmetric() {
        // |-0.5 + i/n| gives i and n - i the same hue
        let colors = bar_colors();
        assert_eq!(colors[64], colors[POINTS - 64]);
        assert_eq!(colors[1], colors[POINTS - 1]);
    }

    #[test]
    fn test_gradient_varies() {
        let colors = bar_colors();
        // Endpoints (hue 0.5) and center (hue ~0) must differ
        assert_ne!(colors[0], colors[POINTS / 2]);
    }
}
