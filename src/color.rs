use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let hsl = Hsl::new(hue, saturation, lightness);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Categorical palette
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            hsl_to_color32(hue, 0.75, 0.55)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diverging scale: signed value → Color32
// ---------------------------------------------------------------------------

/// Red for losses, grey at zero, green for gains, symmetric around zero.
#[derive(Debug, Clone, Copy)]
pub struct DivergingScale {
    max_abs: f64,
}

const LOSS_HUE: f32 = 5.0;
const GAIN_HUE: f32 = 135.0;

impl DivergingScale {
    pub fn new(max_abs: f64) -> Self {
        Self { max_abs }
    }

    /// Position of `value` on `[-1, 1]`.
    pub fn normalized(&self, value: f64) -> f32 {
        if !(self.max_abs > 0.0) || !value.is_finite() {
            return 0.0;
        }
        (value / self.max_abs).clamp(-1.0, 1.0) as f32
    }

    pub fn color_for(&self, value: f64) -> Color32 {
        let t = self.normalized(value);
        let hue = if t < 0.0 { LOSS_HUE } else { GAIN_HUE };
        let strength = t.abs();
        hsl_to_color32(hue, 0.15 + 0.65 * strength, 0.75 - 0.3 * strength)
    }

    /// Legend entries from the most negative to the most positive value.
    pub fn legend_entries(&self, steps: usize) -> Vec<(String, Color32)> {
        if steps < 2 {
            return vec![(format!("{:+.1}", 0.0), self.color_for(0.0))];
        }
        (0..steps)
            .map(|i| {
                let v = -self.max_abs + 2.0 * self.max_abs * i as f64 / (steps - 1) as f64;
                (format!("{v:+.1}"), self.color_for(v))
            })
            .collect()
    }
}
