use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, Srgb};

/// An 8-bit sRGB colour, shared by the plotters and egui front ends.
pub type Rgb = (u8, u8, u8);

/// Observed data points.
pub const DATA: Rgb = (31, 119, 180);
/// Model reference curve.
pub const MODEL: Rgb = (0, 170, 190);
/// Zero line and error bars.
pub const GUIDE: Rgb = (110, 110, 110);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            (
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: dataset name → colour
// ---------------------------------------------------------------------------

/// Maps dataset names to distinct colours so every dataset keeps its colour
/// across fields and yield types.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Rgb>,
}

impl ColorMap {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let unique: BTreeSet<&str> = names.into_iter().collect();
        let palette = generate_palette(unique.len());
        let mapping = unique
            .into_iter()
            .zip(palette)
            .map(|(name, c)| (name.to_string(), c))
            .collect();
        ColorMap { mapping }
    }

    /// Colour for a dataset name; unknown names get the default data colour.
    pub fn color_for(&self, name: &str) -> Rgb {
        self.mapping.get(name).copied().unwrap_or(DATA)
    }

    /// Legend entries (name → colour) in name order.
    pub fn legend_entries(&self) -> Vec<(String, Rgb)> {
        self.mapping.iter().map(|(n, c)| (n.clone(), *c)).collect()
    }
}
