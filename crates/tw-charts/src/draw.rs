//! PNG renderers for each plot shape.
//!
//! Every renderer takes a fully prepared description and writes one file.
//! All coordinates are `f64`; categorical axes place category `i` at `i`.

use std::path::Path;

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use tw_core::stats::Quartiles;

use crate::geometry::{self, Bin, HexCell, HexGrid};
use crate::palette::{self, Colormap};

pub const SIZE: (u32, u32) = (1200, 800);
pub const WIDE: (u32, u32) = (1500, 800);

const FONT: &str = "sans-serif";

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

// ── Axis labelling ────────────────────────────────────────────────────────────

/// How numeric x positions are turned into tick labels.
#[derive(Debug, Clone, PartialEq)]
pub enum XAxis {
    Numeric,
    /// Category `i` sits at `x = i`.
    Categories(Vec<String>),
    /// `x` is a day offset from the given date; ticks show the month.
    Days(NaiveDate),
}

impl XAxis {
    fn label(&self, v: f64) -> String {
        match self {
            XAxis::Numeric => format!("{}", round_tick(v)),
            XAxis::Categories(labels) => category_label(labels, v),
            XAxis::Days(base) => (*base + Duration::days(v.round() as i64))
                .format("%b")
                .to_string(),
        }
    }

    fn ticks(&self) -> usize {
        match self {
            XAxis::Categories(labels) => labels.len().max(1),
            _ => 12,
        }
    }
}

fn category_label(labels: &[String], v: f64) -> String {
    let r = v.round();
    if (v - r).abs() > 1e-6 || r < 0.0 {
        return String::new();
    }
    labels.get(r as usize).cloned().unwrap_or_default()
}

fn round_tick(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn category_range(n: usize) -> std::ops::Range<f64> {
    -0.5..(n.max(1) as f64 - 0.5)
}

// ── Heatmap ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Heatmap {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    /// `values[row][col]`, row `0` drawn at the top.
    pub values: Vec<Vec<f64>>,
    pub colormap: Colormap,
    /// Fixed colour scale; the data extent when `None`.
    pub scale: Option<(f64, f64)>,
    /// Decimals of the in-cell annotation; no annotation when `None`.
    pub annotate: Option<usize>,
}

pub fn heatmap(path: &Path, plot: &Heatmap, size: (u32, u32)) -> Result<()> {
    let rows = plot.values.len();
    let cols = plot.x_labels.len();
    if rows == 0 || cols == 0 {
        bail!("heatmap '{}' has no cells", plot.title);
    }
    let (lo, hi) = plot
        .scale
        .or_else(|| geometry::extent(plot.values.iter().flatten().copied()))
        .unwrap_or((0.0, 1.0));

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, (FONT, 28))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(150)
        .build_cartesian_2d(category_range(cols), category_range(rows))?;

    // Rows are stored top-down but the y axis grows upwards.
    let y_labels: Vec<String> = plot.y_labels.iter().rev().cloned().collect();
    let x_fmt = |v: &f64| category_label(&plot.x_labels, *v);
    let y_fmt = |v: &f64| category_label(&y_labels, *v);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols)
        .y_labels(rows)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_desc(plot.x_desc.as_str())
        .y_desc(plot.y_desc.as_str())
        .draw()?;

    let cells = plot.values.iter().enumerate().flat_map(|(r, row)| {
        let y = (rows - 1 - r) as f64;
        row.iter().enumerate().map(move |(c, v)| (c as f64, y, *v))
    });
    chart.draw_series(cells.clone().map(|(x, y, v)| {
        let color = if v.is_finite() {
            plot.colormap.scaled(v, lo, hi).filled()
        } else {
            WHITE.filled()
        };
        Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], color)
    }))?;

    if let Some(decimals) = plot.annotate {
        let style = (FONT, 14).into_font().color(&BLACK);
        chart.draw_series(cells.filter(|(_, _, v)| v.is_finite()).map(|(x, y, v)| {
            Text::new(
                format!("{:.*}", decimals, v),
                (x - 0.25, y + 0.1),
                style.clone(),
            )
        }))?;
    }

    root.present()?;
    Ok(())
}

// ── Bars ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Bars {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Symmetric error bar half-heights.
    pub errors: Option<Vec<f64>>,
    /// Categories on the y axis, values along x.
    pub horizontal: bool,
    pub color: RGBColor,
}

pub fn bars(path: &Path, plot: &Bars, size: (u32, u32)) -> Result<()> {
    if plot.values.is_empty() {
        bail!("bar plot '{}' has no values", plot.title);
    }
    let n = plot.values.len();
    let tops = plot.values.iter().enumerate().map(|(i, v)| {
        v + plot
            .errors
            .as_ref()
            .and_then(|e| e.get(i))
            .copied()
            .filter(|e| e.is_finite())
            .unwrap_or(0.0)
    });
    let value_range = geometry::zero_based_range(tops);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let fmt = |v: &f64| category_label(&plot.labels, *v);
    let num = |v: &f64| format!("{}", round_tick(*v));

    if plot.horizontal {
        let mut chart = ChartBuilder::on(&root)
            .caption(&plot.title, (FONT, 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(180)
            .build_cartesian_2d(value_range, category_range(n))?;
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&fmt)
            .x_label_formatter(&num)
            .x_desc(plot.x_desc.as_str())
            .y_desc(plot.y_desc.as_str())
            .draw()?;
        chart.draw_series(finite_bars(&plot.values).map(|(i, v)| {
            let y = i as f64;
            Rectangle::new([(0.0, y - 0.4), (v, y + 0.4)], plot.color.filled())
        }))?;
    } else {
        let mut chart = ChartBuilder::on(&root)
            .caption(&plot.title, (FONT, 28))
            .margin(20)
            .x_label_area_size(70)
            .y_label_area_size(70)
            .build_cartesian_2d(category_range(n), value_range)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&fmt)
            .y_label_formatter(&num)
            .x_desc(plot.x_desc.as_str())
            .y_desc(plot.y_desc.as_str())
            .draw()?;
        chart.draw_series(finite_bars(&plot.values).map(|(i, v)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, v)], plot.color.filled())
        }))?;
        if let Some(errors) = &plot.errors {
            let whiskers = plot
                .values
                .iter()
                .zip(errors)
                .enumerate()
                .filter(|(_, (v, e))| v.is_finite() && e.is_finite());
            chart.draw_series(whiskers.map(|(i, (v, e))| {
                let x = i as f64;
                PathElement::new(
                    vec![(x, v - e), (x, v + e)],
                    BLACK.stroke_width(2),
                )
            }))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Bars with a missing (non-finite) value are left out.
fn finite_bars(values: &[f64]) -> impl Iterator<Item = (usize, f64)> + '_ {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
}

// ── Histograms ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Histogram {
    pub title: String,
    pub x_desc: String,
    pub bins: Vec<Bin>,
    pub color: RGBColor,
}

pub fn histogram(path: &Path, plot: &Histogram, size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw_histogram(&root, plot)?;
    root.present()?;
    Ok(())
}

/// Several histograms stacked vertically under one title.
pub fn histogram_panels(path: &Path, title: &str, panels: &[Histogram], size: (u32, u32)) -> Result<()> {
    if panels.is_empty() {
        bail!("'{}' has no panels", title);
    }
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, (FONT, 30))?;
    for (area, panel) in root.split_evenly((panels.len(), 1)).iter().zip(panels) {
        draw_histogram(area, panel)?;
    }
    root.present()?;
    Ok(())
}

fn draw_histogram(area: &Area<'_>, plot: &Histogram) -> Result<()> {
    let (Some(first), Some(last)) = (plot.bins.first(), plot.bins.last()) else {
        bail!("histogram '{}' has no bins", plot.title);
    };
    let y_range = geometry::zero_based_range(plot.bins.iter().map(|b| b.count as f64));
    let mut chart = ChartBuilder::on(area)
        .caption(&plot.title, (FONT, 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(first.lo..last.hi, y_range)?;
    let num = |v: &f64| format!("{}", round_tick(*v));
    chart
        .configure_mesh()
        .x_label_formatter(&num)
        .y_label_formatter(&num)
        .x_desc(plot.x_desc.as_str())
        .y_desc("Frequency")
        .draw()?;
    chart.draw_series(plot.bins.iter().map(|b| {
        Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], plot.color.mix(0.85).filled())
    }))?;
    chart.draw_series(plot.bins.iter().map(|b| {
        Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], BLACK.stroke_width(1))
    }))?;
    Ok(())
}

// ── Lines, areas and scatter ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub markers: bool,
}

#[derive(Debug, Clone)]
pub struct Lines {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub x_axis: XAxis,
    pub series: Vec<Series>,
    /// Fill the area under the first series down to zero.
    pub fill: bool,
}

pub fn lines(path: &Path, plot: &Lines, size: (u32, u32)) -> Result<()> {
    let all = || plot.series.iter().flat_map(|s| s.points.iter());
    if all().next().is_none() {
        bail!("line plot '{}' has no points", plot.title);
    }
    let x_range = match &plot.x_axis {
        XAxis::Categories(labels) => category_range(labels.len()),
        _ => geometry::padded_range(all().map(|p| p.0)),
    };
    let y_range = if plot.fill {
        geometry::zero_based_range(all().map(|p| p.1))
    } else {
        geometry::padded_range(all().map(|p| p.1))
    };

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, (FONT, 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;
    let x_fmt = |v: &f64| plot.x_axis.label(*v);
    let y_fmt = |v: &f64| format!("{}", round_tick(*v));
    chart
        .configure_mesh()
        .x_labels(plot.x_axis.ticks())
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .light_line_style(BLACK.mix(0.1))
        .x_desc(plot.x_desc.as_str())
        .y_desc(plot.y_desc.as_str())
        .draw()?;

    for (idx, series) in plot.series.iter().enumerate() {
        let color = series.color;
        if plot.fill && idx == 0 {
            chart.draw_series(AreaSeries::new(
                series.points.iter().copied(),
                0.0,
                color.mix(0.8),
            ))?;
        }
        chart
            .draw_series(LineSeries::new(series.points.iter().copied(), color.stroke_width(2)))?
            .label(series.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        if series.markers {
            chart.draw_series(
                series
                    .points
                    .iter()
                    .map(|p| Circle::new(*p, 4, color.filled())),
            )?;
        }
    }
    if plot.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Scatter {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub alpha: f64,
    /// Regression line `(slope, intercept)` drawn across the x range.
    pub fit: Option<(f64, f64)>,
}

pub fn scatter(path: &Path, plot: &Scatter, size: (u32, u32)) -> Result<()> {
    if plot.points.is_empty() {
        bail!("scatter '{}' has no points", plot.title);
    }
    let x_range = geometry::padded_range(plot.points.iter().map(|p| p.0));
    let y_range = geometry::padded_range(plot.points.iter().map(|p| p.1));
    let (x0, x1) = (x_range.start, x_range.end);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, (FONT, 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;
    let num = |v: &f64| format!("{}", round_tick(*v));
    chart
        .configure_mesh()
        .x_label_formatter(&num)
        .y_label_formatter(&num)
        .light_line_style(BLACK.mix(0.1))
        .x_desc(plot.x_desc.as_str())
        .y_desc(plot.y_desc.as_str())
        .draw()?;

    chart.draw_series(
        plot.points
            .iter()
            .map(|p| Circle::new(*p, 4, plot.color.mix(plot.alpha).filled())),
    )?;
    if let Some((m, b)) = plot.fit {
        chart.draw_series(LineSeries::new(
            vec![(x0, m * x0 + b), (x1, m * x1 + b)],
            RED.stroke_width(2),
        ))?;
    }

    root.present()?;
    Ok(())
}

// ── Box plots ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BoxPlot {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub groups: Vec<(String, Quartiles)>,
    pub colormap: Colormap,
}

pub fn box_plot(path: &Path, plot: &BoxPlot, size: (u32, u32)) -> Result<()> {
    if plot.groups.is_empty() {
        bail!("box plot '{}' has no groups", plot.title);
    }
    let n = plot.groups.len();
    let labels: Vec<String> = plot.groups.iter().map(|(l, _)| l.clone()).collect();
    let y_range = geometry::padded_range(
        plot.groups
            .iter()
            .flat_map(|(_, q)| [q.min, q.max]),
    );
    let colors = plot.colormap.sample(n);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, (FONT, 28))
        .margin(20)
        .x_label_area_size(90)
        .y_label_area_size(70)
        .build_cartesian_2d(category_range(n), y_range)?;
    let x_fmt = |v: &f64| category_label(&labels, *v);
    let y_fmt = |v: &f64| format!("{}", round_tick(*v));
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_desc(plot.x_desc.as_str())
        .y_desc(plot.y_desc.as_str())
        .draw()?;

    for (i, (_, q)) in plot.groups.iter().enumerate() {
        let x = i as f64;
        let (lo, hi) = q.whiskers();
        chart.draw_series([
            Rectangle::new([(x - 0.3, q.q1), (x + 0.3, q.q3)], colors[i].filled()),
            Rectangle::new([(x - 0.3, q.q1), (x + 0.3, q.q3)], BLACK.stroke_width(1)),
        ])?;
        chart.draw_series([
            PathElement::new(vec![(x - 0.3, q.median), (x + 0.3, q.median)], BLACK.stroke_width(2)),
            PathElement::new(vec![(x, q.q3), (x, hi)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x, q.q1), (x, lo)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x - 0.15, hi), (x + 0.15, hi)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x - 0.15, lo), (x + 0.15, lo)], BLACK.stroke_width(1)),
        ])?;
    }

    root.present()?;
    Ok(())
}

// ── Pie ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pie {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

pub fn pie(path: &Path, plot: &Pie, size: (u32, u32)) -> Result<()> {
    let wedges = geometry::pie_wedges(&plot.values);
    if wedges.is_empty() {
        bail!("pie '{}' has nothing to show", plot.title);
    }
    let total: f64 = plot.values.iter().filter(|v| **v > 0.0).sum();
    let aspect = size.0 as f64 / size.1 as f64;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, (FONT, 28))
        .margin(20)
        .build_cartesian_2d(-1.4 * aspect..1.4 * aspect, -1.4..1.4)?;

    let centre = (0.0, 0.0);
    for (i, wedge) in wedges.iter().enumerate() {
        if wedge.share <= 0.0 {
            continue;
        }
        let color = palette::series_color(i);
        chart.draw_series(std::iter::once(Polygon::new(
            wedge.polygon(centre, 1.0),
            color.filled(),
        )))?;

        let share = tw_core::formatting::format_share(plot.values[i], total);
        let (lx, ly) = wedge.label_anchor(centre, 1.15);
        chart.draw_series(std::iter::once(Text::new(
            format!("{} ({})", plot.labels.get(i).cloned().unwrap_or_default(), share),
            (lx - 0.2, ly),
            (FONT, 16).into_font(),
        )))?;
    }

    root.present()?;
    Ok(())
}

// ── Hexbin ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Hexbin {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub grid: HexGrid,
    pub cells: Vec<HexCell>,
    pub colormap: Colormap,
}

pub fn hexbin(path: &Path, plot: &Hexbin, size: (u32, u32)) -> Result<()> {
    if plot.cells.is_empty() {
        bail!("hexbin '{}' has no cells", plot.title);
    }
    let outline: Vec<(f64, f64)> = plot
        .cells
        .iter()
        .flat_map(|c| plot.grid.vertices((c.cx, c.cy)))
        .collect();
    let x_range = geometry::padded_range(outline.iter().map(|p| p.0));
    let y_range = geometry::padded_range(outline.iter().map(|p| p.1));
    let max = plot.cells.iter().map(|c| c.count).max().unwrap_or(1) as f64;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, (FONT, 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;
    let num = |v: &f64| format!("{}", round_tick(*v));
    chart
        .configure_mesh()
        .x_label_formatter(&num)
        .y_label_formatter(&num)
        .light_line_style(BLACK.mix(0.05))
        .x_desc(plot.x_desc.as_str())
        .y_desc(plot.y_desc.as_str())
        .draw()?;

    chart.draw_series(plot.cells.iter().map(|c| {
        Polygon::new(
            plot.grid.vertices((c.cx, c.cy)),
            plot.colormap.scaled(c.count as f64, 1.0, max).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}
