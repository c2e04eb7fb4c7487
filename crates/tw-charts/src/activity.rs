//! Chart catalogue for the merged activity × weather table.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;
use plotters::style::RGBColor;
use tw_core::models::SourceType;
use tw_core::stats::{correlation_matrix, mean, pearson_r, sample_std, Quartiles};
use tw_core::time_utils::{day_of, month_name, month_of, WEEKDAY_NAMES};
use tw_data::merge::{MergedRow, MergedTable};

use crate::batch::{self, ChartJob, RenderReport};
use crate::draw::{self, Bars, BoxPlot, Heatmap, Hexbin, Histogram, Lines, Pie, Scatter, Series, XAxis};
use crate::geometry;
use crate::palette::Colormap;

const BLUEVIOLET: RGBColor = RGBColor(138, 43, 226);

/// Weather-side columns correlated against each count column.
pub const WEATHER_FEATURES: [&str; 5] = ["temperature", "precipitation", "weather_code", "is_weekend", "hour"];

const HEXBIN_GRIDSIZE: usize = 20;

fn weather_feature(row: &MergedRow, feature: &str) -> f64 {
    match feature {
        "temperature" => row.temperature,
        "precipitation" => row.precipitation,
        "weather_code" => row.weather_code as f64,
        "is_weekend" => f64::from(u8::from(row.is_weekend)),
        "hour" => row.hour as f64,
        _ => f64::NAN,
    }
}

// ── Data preparation ──────────────────────────────────────────────────────────

/// Pearson r of every count column (rows) against [`WEATHER_FEATURES`] (columns).
pub fn weather_correlations(table: &MergedTable) -> Vec<Vec<f64>> {
    let features: Vec<Vec<f64>> = WEATHER_FEATURES
        .iter()
        .map(|f| table.rows.iter().map(|r| weather_feature(r, f)).collect())
        .collect();
    (0..table.sources.len())
        .map(|idx| {
            let counts = table.count_values(idx);
            features.iter().map(|f| pearson_r(&counts, f)).collect()
        })
        .collect()
}

/// `(month, mean, sample std)` of total activity, in calendar order.
pub fn monthly_activity(table: &MergedTable) -> Vec<(u32, f64, f64)> {
    let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        by_month
            .entry(month_of(&row.timestamp))
            .or_default()
            .push(row.total_activity as f64);
    }
    by_month
        .into_iter()
        .map(|(m, v)| (m, mean(&v), sample_std(&v)))
        .collect()
}

fn totals_by_description(table: &MergedTable) -> BTreeMap<&'static str, Vec<f64>> {
    let mut out: BTreeMap<&'static str, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        if let Some(desc) = row.weather_description {
            out.entry(desc).or_default().push(row.total_activity as f64);
        }
    }
    out
}

/// Box-plot summary of total activity per weather description.
pub fn activity_quartiles_by_weather(table: &MergedTable) -> Vec<(String, Quartiles)> {
    totals_by_description(table)
        .into_iter()
        .filter_map(|(desc, v)| Quartiles::from_values(&v).map(|q| (desc.to_string(), q)))
        .collect()
}

/// Mean total activity per description, ascending.
pub fn mean_activity_by_weather(table: &MergedTable) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = totals_by_description(table)
        .into_iter()
        .map(|(desc, v)| (desc.to_string(), mean(&v)))
        .collect();
    out.sort_by(|a, b| a.1.total_cmp(&b.1));
    out
}

/// Mean total activity for each observed hour (rows) and Monday..Sunday
/// (columns); `NaN` where no hour was observed.
pub fn hour_by_weekday(table: &MergedTable) -> (Vec<u32>, Vec<Vec<f64>>) {
    let mut cells: BTreeMap<(u32, u32), Vec<f64>> = BTreeMap::new();
    let mut hours = BTreeSet::new();
    for row in &table.rows {
        hours.insert(row.hour);
        cells
            .entry((row.hour, row.day_of_week.num_days_from_monday()))
            .or_default()
            .push(row.total_activity as f64);
    }
    let hours: Vec<u32> = hours.into_iter().collect();
    let matrix = hours
        .iter()
        .map(|h| {
            (0..7)
                .map(|d| cells.get(&(*h, d)).map_or(f64::NAN, |v| mean(v)))
                .collect()
        })
        .collect();
    (hours, matrix)
}

/// Mean of each count column.
pub fn activity_means(table: &MergedTable) -> Vec<f64> {
    (0..table.sources.len())
        .map(|idx| mean(&table.count_values(idx)))
        .collect()
}

/// `(hour, mean total activity)` for each observed hour.
pub fn hourly_means(table: &MergedTable) -> Vec<(u32, f64)> {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        by_hour.entry(row.hour).or_default().push(row.total_activity as f64);
    }
    by_hour.into_iter().map(|(h, v)| (h, mean(&v))).collect()
}

/// Mean total activity Monday..Sunday; `NaN` for days never observed.
pub fn weekday_means(table: &MergedTable) -> Vec<f64> {
    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        by_day
            .entry(row.day_of_week.num_days_from_monday())
            .or_default()
            .push(row.total_activity as f64);
    }
    (0..7)
        .map(|d| by_day.get(&d).map_or(f64::NAN, |v| mean(v)))
        .collect()
}

/// Mean of the count column `idx` per hour (rows) and description (columns).
pub fn hour_by_weather(table: &MergedTable, idx: usize) -> (Vec<u32>, Vec<String>, Vec<Vec<f64>>) {
    let mut cells: BTreeMap<(u32, &str), Vec<f64>> = BTreeMap::new();
    let mut hours = BTreeSet::new();
    let mut descs = BTreeSet::new();
    for row in &table.rows {
        let Some(desc) = row.weather_description else {
            continue;
        };
        hours.insert(row.hour);
        descs.insert(desc);
        cells
            .entry((row.hour, desc))
            .or_default()
            .push(row.counts[idx] as f64);
    }
    let hours: Vec<u32> = hours.into_iter().collect();
    let descs: Vec<&str> = descs.into_iter().collect();
    let matrix = hours
        .iter()
        .map(|h| {
            descs
                .iter()
                .map(|d| cells.get(&(*h, *d)).map_or(f64::NAN, |v| mean(v)))
                .collect()
        })
        .collect();
    (hours, descs.into_iter().map(str::to_string).collect(), matrix)
}

/// Sum of total activity per calendar day (rows) and description (columns).
pub fn daily_weather_totals(table: &MergedTable) -> (Vec<NaiveDate>, Vec<String>, Vec<Vec<f64>>) {
    let mut cells: BTreeMap<(NaiveDate, &str), u64> = BTreeMap::new();
    let mut dates = BTreeSet::new();
    let mut descs = BTreeSet::new();
    for row in &table.rows {
        let Some(desc) = row.weather_description else {
            continue;
        };
        let day = day_of(&row.timestamp);
        dates.insert(day);
        descs.insert(desc);
        *cells.entry((day, desc)).or_insert(0) += row.total_activity;
    }
    let dates: Vec<NaiveDate> = dates.into_iter().collect();
    let descs: Vec<&str> = descs.into_iter().collect();
    let matrix = dates
        .iter()
        .map(|day| {
            descs
                .iter()
                .map(|d| cells.get(&(*day, *d)).map_or(f64::NAN, |v| *v as f64))
                .collect()
        })
        .collect();
    (dates, descs.into_iter().map(str::to_string).collect(), matrix)
}

fn count_histogram(table: &MergedTable, idx: usize, color: RGBColor) -> Histogram {
    let values = table.count_values(idx);
    let max = geometry::extent(values.iter().copied()).map_or(0.0, |(_, hi)| hi);
    let bins = ((max as usize) + 1).clamp(1, 30);
    Histogram {
        title: format!("Distribution of {}", table.sources[idx].title()),
        x_desc: table.sources[idx].count_column(),
        bins: geometry::histogram(&values, bins),
        color,
    }
}

// ── Catalogue ─────────────────────────────────────────────────────────────────

/// Every chart of the catalogue as an independent job.
pub fn jobs(table: &MergedTable) -> Vec<ChartJob<'_>> {
    let mut jobs = Vec::new();
    let source_titles: Vec<String> = table.sources.iter().map(SourceType::title).collect();
    let cool = Colormap::Cool.sample(table.sources.len());

    jobs.push(ChartJob::new("correlation_heatmap", {
        let y_labels = source_titles.clone();
        move |path: &Path| {
            draw::heatmap(
                path,
                &Heatmap {
                    title: "Correlation between Activities and Weather Conditions".into(),
                    x_desc: String::new(),
                    y_desc: String::new(),
                    x_labels: WEATHER_FEATURES.iter().map(|f| tw_core::models::title_case(f)).collect(),
                    y_labels,
                    values: weather_correlations(table),
                    colormap: Colormap::Cool,
                    scale: Some((-1.0, 1.0)),
                    annotate: Some(2),
                },
                draw::SIZE,
            )
        }
    }));

    for (name, range) in [
        ("activity_distributions_1", 0..table.sources.len().min(3)),
        ("activity_distributions_2", table.sources.len().min(3)..table.sources.len()),
    ] {
        let colors = cool.clone();
        jobs.push(ChartJob::new(name, move |path: &Path| {
            let panels: Vec<Histogram> = range
                .map(|idx| count_histogram(table, idx, colors[idx]))
                .collect();
            draw::histogram_panels(path, "Activity Distributions", &panels, (1200, 1200))
        }));
    }

    jobs.push(ChartJob::new("monthly_patterns", move |path: &Path| {
        let monthly = monthly_activity(table);
        draw::bars(
            path,
            &Bars {
                title: "Monthly TikTok Activity Patterns".into(),
                x_desc: "Month".into(),
                y_desc: "Average Activity (with std dev)".into(),
                labels: monthly.iter().map(|(m, ..)| month_name(*m).to_string()).collect(),
                values: monthly.iter().map(|(_, mean, _)| *mean).collect(),
                errors: Some(monthly.iter().map(|(.., std)| *std).collect()),
                horizontal: false,
                color: BLUEVIOLET,
            },
            draw::SIZE,
        )
    }));

    jobs.push(ChartJob::new("weather_activity_boxplot", move |path: &Path| {
        draw::box_plot(
            path,
            &BoxPlot {
                title: "Activity Distribution by Weather Condition".into(),
                x_desc: "Weather Condition".into(),
                y_desc: "Total Activity".into(),
                groups: activity_quartiles_by_weather(table),
                colormap: Colormap::Cool,
            },
            draw::WIDE,
        )
    }));

    jobs.push(ChartJob::new("hourly_heatmap", move |path: &Path| {
        let (hours, values) = hour_by_weekday(table);
        draw::heatmap(
            path,
            &Heatmap {
                title: "Average Activity by Hour and Day of Week".into(),
                x_desc: "Day of Week".into(),
                y_desc: "Hour".into(),
                x_labels: WEEKDAY_NAMES.iter().map(|d| d.to_string()).collect(),
                y_labels: hours.iter().map(|h| h.to_string()).collect(),
                values,
                colormap: Colormap::Cool,
                scale: None,
                annotate: Some(1),
            },
            draw::SIZE,
        )
    }));

    jobs.push(ChartJob::new("temperature_activity_hexbin", move |path: &Path| {
        let points: Vec<(f64, f64)> = table
            .rows
            .iter()
            .map(|r| (r.temperature, r.total_activity as f64))
            .collect();
        let (grid, cells) = geometry::hexbin(&points, HEXBIN_GRIDSIZE);
        let grid = grid.ok_or_else(|| anyhow::anyhow!("no finite temperature/activity pairs"))?;
        draw::hexbin(
            path,
            &Hexbin {
                title: "Temperature vs Activity Density".into(),
                x_desc: "Temperature (°C)".into(),
                y_desc: "Activity Count".into(),
                grid,
                cells,
                colormap: Colormap::Cool,
            },
            draw::SIZE,
        )
    }));

    jobs.push(ChartJob::new("activity_type_comparison", {
        let labels = source_titles.clone();
        move |path: &Path| {
            draw::pie(
                path,
                &Pie {
                    title: "Distribution of Activity Types".into(),
                    labels,
                    values: activity_means(table),
                },
                (1000, 700),
            )
        }
    }));

    jobs.push(ChartJob::new("activity_by_weather", move |path: &Path| {
        let by_weather = mean_activity_by_weather(table);
        draw::bars(
            path,
            &Bars {
                title: "Average TikTok Activity by Weather Condition".into(),
                x_desc: "Average Activity".into(),
                y_desc: "Weather Condition".into(),
                labels: by_weather.iter().map(|(d, _)| d.clone()).collect(),
                values: by_weather.iter().map(|(_, v)| *v).collect(),
                errors: None,
                horizontal: true,
                color: BLUEVIOLET,
            },
            draw::SIZE,
        )
    }));

    jobs.push(ChartJob::new("temperature_correlation", move |path: &Path| {
        let points: Vec<(f64, f64)> = table
            .rows
            .iter()
            .map(|r| (r.temperature, r.total_activity as f64))
            .collect();
        draw::scatter(
            path,
            &Scatter {
                title: "TikTok Activity vs Temperature".into(),
                x_desc: "Temperature (°C)".into(),
                y_desc: "Activity Count".into(),
                fit: geometry::linear_fit(&points),
                points,
                color: RGBColor(31, 119, 180),
                alpha: 0.5,
            },
            draw::SIZE,
        )
    }));

    jobs.push(ChartJob::new("hourly_patterns", move |path: &Path| {
        draw::lines(
            path,
            &Lines {
                title: "Average TikTok Activity Throughout the Day".into(),
                x_desc: "Hour of Day".into(),
                y_desc: "Average Activity".into(),
                x_axis: XAxis::Categories((0..24).map(|h| h.to_string()).collect()),
                series: vec![Series {
                    name: "Average Activity".into(),
                    points: hourly_means(table)
                        .into_iter()
                        .map(|(h, v)| (h as f64, v))
                        .collect(),
                    color: Colormap::Cool.color(0.6),
                    markers: true,
                }],
                fill: false,
            },
            draw::SIZE,
        )
    }));

    jobs.push(ChartJob::new("weekly_patterns", move |path: &Path| {
        draw::bars(
            path,
            &Bars {
                title: "Average TikTok Activity by Day of Week".into(),
                x_desc: "Day of Week".into(),
                y_desc: "Average Activity".into(),
                labels: WEEKDAY_NAMES.iter().map(|d| d.to_string()).collect(),
                values: weekday_means(table),
                errors: None,
                horizontal: false,
                color: BLUEVIOLET,
            },
            draw::SIZE,
        )
    }));

    for (idx, source) in table.sources.iter().enumerate() {
        let title = format!("{} by Hour and Weather Condition", source.title());
        jobs.push(ChartJob::new(
            format!("heatmap_{}", source.count_column()),
            move |path: &Path| {
                let (hours, descs, values) = hour_by_weather(table, idx);
                draw::heatmap(
                    path,
                    &Heatmap {
                        title,
                        x_desc: "Weather Condition".into(),
                        y_desc: "Hour of Day".into(),
                        x_labels: descs,
                        y_labels: hours.iter().map(|h| h.to_string()).collect(),
                        values,
                        colormap: Colormap::Cool,
                        scale: None,
                        annotate: Some(1),
                    },
                    draw::WIDE,
                )
            },
        ));
    }

    jobs.push(ChartJob::new("activity_correlation_heatmap", {
        let labels = source_titles;
        move |path: &Path| {
            let columns: Vec<Vec<f64>> = (0..table.sources.len())
                .map(|idx| table.count_values(idx))
                .collect();
            draw::heatmap(
                path,
                &Heatmap {
                    title: "Correlation Between Different Types of Activities".into(),
                    x_desc: String::new(),
                    y_desc: String::new(),
                    x_labels: labels.clone(),
                    y_labels: labels,
                    values: correlation_matrix(&columns),
                    colormap: Colormap::CoolWarm,
                    scale: Some((-1.0, 1.0)),
                    annotate: Some(2),
                },
                (1000, 800),
            )
        }
    }));

    jobs.push(ChartJob::new("weather_activity_time_heatmap", move |path: &Path| {
        let (dates, descs, values) = daily_weather_totals(table);
        draw::heatmap(
            path,
            &Heatmap {
                title: "Activity Patterns Across Weather Conditions Over Time".into(),
                x_desc: "Weather Condition".into(),
                y_desc: "Date".into(),
                x_labels: descs,
                y_labels: dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
                values,
                colormap: Colormap::Cool,
                scale: None,
                annotate: None,
            },
            (1500, 1000),
        )
    }));

    jobs
}

/// Render the whole catalogue into `dir`.
pub fn render(table: &MergedTable, dir: &Path) -> RenderReport {
    batch::run(dir, jobs(table))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
