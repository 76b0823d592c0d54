use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use vk_stats::Metric;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: metric → Color32
// ---------------------------------------------------------------------------

/// A fixed colour per metric so switching metrics also switches colour.
#[derive(Debug, Clone)]
pub struct MetricColors {
    mapping: BTreeMap<Metric, Color32>,
    default_color: Color32,
}

impl Default for MetricColors {
    fn default() -> Self {
        let mapping = Metric::ALL
            .into_iter()
            .zip(generate_palette(Metric::ALL.len()))
            .collect();
        MetricColors {
            mapping,
            default_color: Color32::LIGHT_BLUE,
        }
    }
}

impl MetricColors {
    pub fn color_for(&self, metric: Metric) -> Color32 {
        self.mapping
            .get(&metric)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colours() {
        let colors = generate_palette(4);
        assert_eq!(colors.len(), 4);
        assert_ne!(colors[0], colors[2]);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn every_metric_has_a_colour() {
        let colors = MetricColors::default();
        assert_ne!(colors.color_for(Metric::Views), colors.color_for(Metric::ReachAds));
    }
}
