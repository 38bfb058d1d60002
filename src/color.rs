use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            hsl_to_color32(Hsl::new(hue, 0.75, 0.55))
        })
        .collect()
}

/// Diverging blue → white → red scale for correlation cells.
/// Undefined coefficients get no colour.
pub fn heat_color(value: Option<f64>) -> Option<Color32> {
    let v = value?.clamp(-1.0, 1.0) as f32;
    let hue = if v < 0.0 { 225.0 } else { 5.0 };
    let lightness = 0.95 - 0.45 * v.abs();
    Some(hsl_to_color32(Hsl::new(hue, 0.7, lightness)))
}

// ---------------------------------------------------------------------------
// Color mapping: cell value → Color32
// ---------------------------------------------------------------------------

/// Maps distinct values of a chosen column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub column: String,
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map for the given column from its distinct values.
    pub fn new(column: &str, values: &BTreeSet<CellValue>) -> Self {
        let palette = generate_palette(values.len());
        let mapping: BTreeMap<CellValue, Color32> = values
            .iter()
            .zip(palette)
            .map(|(v, c): (&CellValue, Color32)| (v.clone(), c))
            .collect();

        ColorMap {
            column: column.to_string(),
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let colours = generate_palette(5);
        assert_eq!(colours.len(), 5);
        let unique: BTreeSet<[u8; 4]> = colours.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn undefined_correlation_has_no_colour() {
        assert_eq!(heat_color(None), None);
        assert_ne!(heat_color(Some(1.0)), heat_color(Some(-1.0)));
    }

    #[test]
    fn unknown_values_fall_back_to_grey() {
        let values: BTreeSet<CellValue> = [CellValue::String("North".into())].into_iter().collect();
        let map = ColorMap::new("Region", &values);
        assert_ne!(map.color_for(&CellValue::String("North".into())), Color32::GRAY);
        assert_eq!(map.color_for(&CellValue::String("South".into())), Color32::GRAY);
    }
}
