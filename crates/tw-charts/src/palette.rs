//! Colour maps and categorical colours.

use plotters::style::RGBColor;

/// Continuous colour maps used by heatmaps, box plots and hexbins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    /// Cyan to magenta.
    Cool,
    /// Blue through light grey to red.
    CoolWarm,
    /// Dark purple through teal to yellow.
    Viridis,
}

impl Colormap {
    /// Colour at position `t` in `[0, 1]`; out-of-range and `NaN` are clamped.
    pub fn color(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Cool => RGBColor(channel(t), channel(1.0 - t), 255),
            Colormap::CoolWarm => interpolate(COOLWARM_STOPS, t),
            Colormap::Viridis => interpolate(VIRIDIS_STOPS, t),
        }
    }

    /// Colour for `value` scaled into `[min, max]`.
    pub fn scaled(&self, value: f64, min: f64, max: f64) -> RGBColor {
        self.color(normalize(value, min, max))
    }

    /// `n` evenly spaced colours, for categorical use of a continuous map.
    pub fn sample(&self, n: usize) -> Vec<RGBColor> {
        match n {
            0 => Vec::new(),
            1 => vec![self.color(0.5)],
            _ => (0..n)
                .map(|i| self.color(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

const COOLWARM_STOPS: &[(f64, (u8, u8, u8))] = &[
    (0.0, (59, 76, 192)),
    (0.25, (124, 159, 249)),
    (0.5, (221, 221, 221)),
    (0.75, (245, 155, 122)),
    (1.0, (180, 4, 38)),
];

const VIRIDIS_STOPS: &[(f64, (u8, u8, u8))] = &[
    (0.0, (68, 1, 84)),
    (0.25, (59, 82, 139)),
    (0.5, (33, 145, 140)),
    (0.75, (94, 201, 98)),
    (1.0, (253, 231, 37)),
];

/// Fixed categorical colours for line and pie series.
pub const SERIES: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

pub fn series_color(idx: usize) -> RGBColor {
    SERIES[idx % SERIES.len()]
}

/// Position of `value` within `[min, max]`; `0.5` for a degenerate range.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if !span.is_finite() || span.abs() < f64::EPSILON {
        return 0.5;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

fn channel(t: f64) -> u8 {
    (t * 255.0).round().clamp(0.0, 255.0) as u8
}

fn interpolate(stops: &[(f64, (u8, u8, u8))], t: f64) -> RGBColor {
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
            return RGBColor(lerp(c0.0, c1.0), lerp(c0.1, c1.1), lerp(c0.2, c1.2));
        }
    }
    let (_, last) = stops[stops.len() - 1];
    RGBColor(last.0, last.1, last.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cool_endpoints() {
        assert_eq!(Colormap::Cool.color(0.0), RGBColor(0, 255, 255));
        assert_eq!(Colormap::Cool.color(1.0), RGBColor(255, 0, 255));
    }

    #[test]
    fn test_stops_hit_exactly() {
        assert_eq!(Colormap::Viridis.color(0.0), RGBColor(68, 1, 84));
        assert_eq!(Colormap::Viridis.color(1.0), RGBColor(253, 231, 37));
        assert_eq!(Colormap::CoolWarm.color(0.5), RGBColor(221, 221, 221));
    }

    #[test]
    fn test_clamps_out_of_range() {
        assert_eq!(Colormap::CoolWarm.color(-3.0), Colormap::CoolWarm.color(0.0));
        assert_eq!(Colormap::CoolWarm.color(7.0), Colormap::CoolWarm.color(1.0));
    }

    #[test]
    fn test_normalize_degenerate_range() {
        assert_eq!(normalize(3.0, 3.0, 3.0), 0.5);
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(-1.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_sample_count() {
        assert_eq!(Colormap::Cool.sample(0).len(), 0);
        assert_eq!(Colormap::Cool.sample(4).len(), 4);
        assert_eq!(Colormap::Cool.sample(4)[0], Colormap::Cool.color(0.0));
    }
}
