use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use matdash::data::Value;

fn hsl_color(hue: f32) -> Color32 {
    let hsl = Hsl::new(hue, 0.75, 0.55);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| hsl_color((i as f32 / n as f32) * 360.0))
        .collect()
}

// ---------------------------------------------------------------------------
// Categorical mapping: value → Color32
// ---------------------------------------------------------------------------

/// Maps distinct values (particle names) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Value, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(values: &BTreeSet<Value>) -> Self {
        let palette = generate_palette(values.len());
        let mapping = values.iter().cloned().zip(palette).collect();
        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, value: Option<&Value>) -> Color32 {
        value
            .and_then(|v| self.mapping.get(v))
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Continuous mapping: number → Color32
// ---------------------------------------------------------------------------

/// Blue-to-red gradient over the observed range of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
}

impl ColorScale {
    /// `None` when there is nothing to scale.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (min, max) = value_range(values)?;
        Some(ColorScale { min, max })
    }

    pub fn color_for(&self, value: Option<f64>) -> Color32 {
        match value {
            Some(v) => hsl_color(240.0 * (1.0 - normalized(v, self.min, self.max)) as f32),
            None => Color32::GRAY,
        }
    }
}

/// Min and max of the finite values, if any.
pub fn value_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Position of `v` in `[min, max]` as 0..=1. A zero-width range maps to 0.5.
pub fn normalized(v: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.abs() < f64::EPSILON {
        0.5
    } else {
        ((v - min) / range).clamp(0.0, 1.0)
    }
}
