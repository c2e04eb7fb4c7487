//! Pure data preparation behind the drawn shapes: bins, hexagons, wedges and
//! regression lines. Nothing here touches a drawing backend.

use std::f64::consts::PI;
use std::ops::Range;

// ── Axis ranges ───────────────────────────────────────────────────────────────

/// Min/max of the finite values, `None` when there are none.
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Axis range covering `values` with 5% padding each side.
///
/// Falls back to `0..1` for empty input and widens a zero-width range by 1.
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    match extent(values) {
        None => 0.0..1.0,
        Some((lo, hi)) if (hi - lo).abs() < 1e-9 => (lo - 1.0)..(hi + 1.0),
        Some((lo, hi)) => {
            let pad = (hi - lo) * 0.05;
            (lo - pad)..(hi + pad)
        }
    }
}

/// Range `0..max` with headroom, for bar heights and counts.
pub fn zero_based_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let max = extent(values).map_or(1.0, |(_, hi)| hi.max(0.0));
    if max <= 0.0 {
        0.0..1.0
    } else {
        0.0..max * 1.1
    }
}

// ── Histogram ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// `bins` equal-width bins over the data extent.
///
/// The last bin is closed on the right so the maximum is counted.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let Some((lo, hi)) = extent(values.iter().copied()) else {
        return Vec::new();
    };
    let bins = bins.max(1);
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
    let width = (hi - lo) / bins as f64;

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lo: lo + width * i as f64,
            hi: lo + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

// ── Hexagonal binning ─────────────────────────────────────────────────────────

/// One occupied hexagon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexCell {
    pub cx: f64,
    pub cy: f64,
    pub count: usize,
}

/// Pointy-top hexagonal grid with `gridsize` hexagons across the x extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexGrid {
    pub x0: f64,
    pub y0: f64,
    /// Horizontal distance between neighbouring centres in one row.
    pub dx: f64,
    /// Vertical distance between rows.
    pub dy: f64,
}

impl HexGrid {
    pub fn fit(points: &[(f64, f64)], gridsize: usize) -> Option<Self> {
        let (x0, x1) = extent(points.iter().map(|p| p.0))?;
        let (y0, y1) = extent(points.iter().map(|p| p.1))?;
        let gridsize = gridsize.max(1) as f64;
        let dx = if x1 > x0 { (x1 - x0) / gridsize } else { 1.0 };
        let rows = (gridsize / 3f64.sqrt()).max(1.0);
        let dy = if y1 > y0 { (y1 - y0) / rows } else { 1.0 };
        Some(Self { x0, y0, dx, dy })
    }

    /// Centre of the hexagon containing `(x, y)`.
    pub fn locate(&self, x: f64, y: f64) -> (f64, f64) {
        let row = ((y - self.y0) / self.dy).round();
        let offset = if (row as i64).rem_euclid(2) == 1 { self.dx / 2.0 } else { 0.0 };
        let col = ((x - self.x0 - offset) / self.dx).round();
        let candidate = (self.x0 + offset + col * self.dx, self.y0 + row * self.dy);

        // The nearest row centre may lose to a neighbour in the adjacent rows.
        let mut best = candidate;
        let mut best_d = self.distance((x, y), candidate);
        for dr in [-1.0, 1.0] {
            let r = row + dr;
            let off = if (r as i64).rem_euclid(2) == 1 { self.dx / 2.0 } else { 0.0 };
            let c = ((x - self.x0 - off) / self.dx).round();
            let centre = (self.x0 + off + c * self.dx, self.y0 + r * self.dy);
            let d = self.distance((x, y), centre);
            if d < best_d {
                best = centre;
                best_d = d;
            }
        }
        best
    }

    /// Six vertices of the hexagon around `centre`.
    pub fn vertices(&self, centre: (f64, f64)) -> Vec<(f64, f64)> {
        // Pointy-top: neighbours sit sqrt(3)*r apart in a row, rows 1.5*r apart.
        let rx = self.dx / 3f64.sqrt();
        let ry = self.dy / 1.5;
        (0..6)
            .map(|i| {
                let angle = PI / 6.0 + PI / 3.0 * i as f64;
                (centre.0 + rx * angle.cos(), centre.1 + ry * angle.sin())
            })
            .collect()
    }

    fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let ddx = (a.0 - b.0) / self.dx;
        let ddy = (a.1 - b.1) / self.dy;
        ddx * ddx + ddy * ddy
    }
}

/// Bin points into hexagons; only occupied cells are returned.
pub fn hexbin(points: &[(f64, f64)], gridsize: usize) -> (Option<HexGrid>, Vec<HexCell>) {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let Some(grid) = HexGrid::fit(&finite, gridsize) else {
        return (None, Vec::new());
    };

    let mut cells: Vec<HexCell> = Vec::new();
    for (x, y) in finite {
        let (cx, cy) = grid.locate(x, y);
        match cells
            .iter_mut()
            .find(|c| (c.cx - cx).abs() < 1e-9 && (c.cy - cy).abs() < 1e-9)
        {
            Some(cell) => cell.count += 1,
            None => cells.push(HexCell { cx, cy, count: 1 }),
        }
    }
    (Some(grid), cells)
}

// ── Pie wedges ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    /// Start and end angle in radians, counter-clockwise from 12 o'clock.
    pub start: f64,
    pub end: f64,
    /// Fraction of the whole, `0..=1`.
    pub share: f64,
}

impl Wedge {
    /// Polygon approximating the wedge on a circle of `radius` at `centre`.
    pub fn polygon(&self, centre: (f64, f64), radius: f64) -> Vec<(f64, f64)> {
        let steps = (((self.end - self.start) / (2.0 * PI)) * 90.0).ceil().max(2.0) as usize;
        let mut pts = Vec::with_capacity(steps + 2);
        pts.push(centre);
        for i in 0..=steps {
            let a = self.start + (self.end - self.start) * i as f64 / steps as f64;
            pts.push(point_on_circle(centre, radius, a));
        }
        pts
    }

    /// Point at the angular middle of the wedge, `radius` from `centre`.
    pub fn label_anchor(&self, centre: (f64, f64), radius: f64) -> (f64, f64) {
        point_on_circle(centre, radius, (self.start + self.end) / 2.0)
    }
}

fn point_on_circle(centre: (f64, f64), radius: f64, angle: f64) -> (f64, f64) {
    // Angle 0 is straight up, increasing counter-clockwise.
    (centre.0 - radius * angle.sin(), centre.1 + radius * angle.cos())
}

/// Split a full circle proportionally to `values`; non-positive values get
/// an empty wedge. Empty when the total is not positive.
pub fn pie_wedges(values: &[f64]) -> Vec<Wedge> {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 || !total.is_finite() {
        return Vec::new();
    }
    let mut angle = 0.0;
    values
        .iter()
        .map(|v| {
            let share = if *v > 0.0 { v / total } else { 0.0 };
            let start = angle;
            angle += share * 2.0 * PI;
            Wedge {
                start,
                end: angle,
                share,
            }
        })
        .collect()
}

// ── Regression ────────────────────────────────────────────────────────────────

/// Least-squares line `y = slope * x + intercept`; `None` without x variance.
pub fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
    if sxx.abs() < f64::EPSILON {
        return None;
    }
    let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(Vec::new()), 0.0..1.0);
        assert_eq!(padded_range([2.0, 2.0]), 1.0..3.0);
        let r = padded_range([0.0, 10.0, f64::NAN]);
        assert!((r.start + 0.5).abs() < 1e-12);
        assert!((r.end - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        let bins = histogram(&values, 11);
        assert_eq!(bins.len(), 11);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 11);
        assert_eq!(bins[10].count, 1);
        assert_eq!(bins[0].lo, 0.0);
        assert!((bins[10].hi - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_constant_values() {
        let bins = histogram(&[3.0, 3.0, 3.0], 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(histogram(&[], 10).is_empty());
    }

    #[test]
    fn test_hexbin_preserves_point_count() {
        let points: Vec<(f64, f64)> = (0..200)
            .map(|i| ((i % 17) as f64 * 1.3, (i % 11) as f64 * 0.7))
            .collect();
        let (grid, cells) = hexbin(&points, 20);
        assert!(grid.is_some());
        assert_eq!(cells.iter().map(|c| c.count).sum::<usize>(), 200);
    }

    #[test]
    fn test_hexbin_same_point_one_cell() {
        let (_, cells) = hexbin(&[(1.0, 1.0), (1.0, 1.0)], 20);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 2);
    }

    #[test]
    fn test_hex_vertices() {
        let grid = HexGrid::fit(&[(0.0, 0.0), (10.0, 10.0)], 10).unwrap();
        assert_eq!(grid.vertices((5.0, 5.0)).len(), 6);
    }

    #[test]
    fn test_pie_wedges_cover_circle() {
        let wedges = pie_wedges(&[1.0, 1.0, 2.0]);
        assert_eq!(wedges.len(), 3);
        assert!((wedges[2].share - 0.5).abs() < 1e-12);
        assert!((wedges[2].end - 2.0 * PI).abs() < 1e-9);
        assert_eq!(wedges[0].start, 0.0);
    }

    #[test]
    fn test_pie_wedges_zero_total() {
        assert!(pie_wedges(&[0.0, 0.0]).is_empty());
    }

    #[test]
    fn test_wedge_polygon_starts_at_centre() {
        let w = pie_wedges(&[1.0])[0];
        let poly = w.polygon((0.0, 0.0), 1.0);
        assert_eq!(poly[0], (0.0, 0.0));
        let (x, y) = poly[1];
        assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit() {
        let (m, b) = linear_fit(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert!((m - 2.0).abs() < 1e-12);
        assert!((b - 1.0).abs() < 1e-12);
        assert!(linear_fit(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }
}
