//! Charts for an annual daily weather file.
//!
//! A chart whose columns are absent from the file is reported as failed
//! with the missing column named; the rest of the batch still renders.

use std::collections::BTreeSet;
use std::path::Path;

use plotters::style::RGBColor;
use tw_core::stats::{correlation_matrix, Quartiles};
use tw_core::time_utils::month_name;
use tw_data::annual::{AnnualColumn, AnnualWeather};

use crate::batch::{self, ChartJob, RenderReport};
use crate::draw::{self, BoxPlot, Heatmap, Histogram, Lines, Scatter, Series, XAxis};
use crate::geometry;
use crate::palette::Colormap;

const RAINFALL_BINS: usize = 11;

const BLUE: RGBColor = RGBColor(31, 119, 180);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const PINK: RGBColor = RGBColor(255, 192, 203);
const MAGENTA: RGBColor = RGBColor(255, 0, 255);

// ── Data preparation ──────────────────────────────────────────────────────────

/// `(day offset from the first date, value)` for `column`.
pub fn day_series(weather: &AnnualWeather, column: AnnualColumn) -> Vec<(f64, f64)> {
    let Some(first) = weather.days.first().map(|d| d.date) else {
        return Vec::new();
    };
    weather
        .days
        .iter()
        .filter_map(|d| {
            d.get(column)
                .map(|v| ((d.date - first).num_days() as f64, v))
        })
        .collect()
}

/// Box-plot summary of `column` for each month present, calendar order.
pub fn monthly_quartiles(weather: &AnnualWeather, column: AnnualColumn) -> Vec<(String, Quartiles)> {
    weather
        .by_month(column)
        .into_iter()
        .filter_map(|(m, v)| Quartiles::from_values(&v).map(|q| (month_name(m).to_string(), q)))
        .collect()
}

/// Pairwise correlation of the columns present, with their headers.
pub fn column_correlations(weather: &AnnualWeather) -> (Vec<String>, Vec<Vec<f64>>) {
    let labels = weather.columns.iter().map(|c| c.header().to_string()).collect();
    let series: Vec<Vec<f64>> = weather.columns.iter().map(|c| weather.series(*c)).collect();
    (labels, correlation_matrix(&series))
}

/// Monthly means of the maximum and minimum temperature: `(months, rows)`
/// where each row is `[max, min]`.
pub fn monthly_temperature_means(weather: &AnnualWeather) -> (Vec<u32>, Vec<Vec<f64>>) {
    let max = weather.monthly_means(AnnualColumn::TemperatureMaximum);
    let min = weather.monthly_means(AnnualColumn::TemperatureMinimum);
    let months: BTreeSet<u32> = max.keys().chain(min.keys()).copied().collect();
    let months: Vec<u32> = months.into_iter().collect();
    let rows = months
        .iter()
        .map(|m| {
            vec![
                max.get(m).copied().unwrap_or(f64::NAN),
                min.get(m).copied().unwrap_or(f64::NAN),
            ]
        })
        .collect();
    (months, rows)
}

fn missing(weather: &AnnualWeather, columns: &[AnnualColumn]) -> Option<String> {
    let absent: Vec<&str> = columns
        .iter()
        .filter(|c| !weather.has(**c))
        .map(|c| c.header())
        .collect();
    if absent.is_empty() {
        None
    } else {
        Some(format!("missing column(s): {}", absent.join(", ")))
    }
}

/// Job for `name`, or a skipped job naming the absent columns.
fn requiring<'a>(
    weather: &AnnualWeather,
    name: &str,
    columns: &[AnnualColumn],
    draw: impl FnOnce(&Path) -> anyhow::Result<()> + 'a,
) -> ChartJob<'a> {
    match missing(weather, columns) {
        Some(reason) => ChartJob::skipped(name, reason),
        None => ChartJob::new(name, draw),
    }
}

// ── Catalogue ─────────────────────────────────────────────────────────────────

pub fn jobs(weather: &AnnualWeather) -> Vec<ChartJob<'_>> {
    use AnnualColumn::*;

    let first_day = weather.days.first().map(|d| d.date);
    let mut jobs = Vec::new();

    jobs.push(requiring(
        weather,
        "daily_temperatures",
        &[TemperatureMaximum, TemperatureMinimum],
        move |path: &Path| {
            let base = first_day.ok_or_else(|| anyhow::anyhow!("no days loaded"))?;
            draw::lines(
                path,
                &Lines {
                    title: "Daily Maximum and Minimum Temperatures".into(),
                    x_desc: "Date".into(),
                    y_desc: "Temperature (°C)".into(),
                    x_axis: XAxis::Days(base),
                    series: vec![
                        Series {
                            name: "Max Temperature".into(),
                            points: day_series(weather, TemperatureMaximum),
                            color: BLUE,
                            markers: false,
                        },
                        Series {
                            name: "Min Temperature".into(),
                            points: day_series(weather, TemperatureMinimum),
                            color: ORANGE,
                            markers: false,
                        },
                    ],
                    fill: false,
                },
                draw::WIDE,
            )
        },
    ));

    jobs.push(requiring(
        weather,
        "cumulative_rainfall",
        &[PrecipitationTotal],
        move |path: &Path| {
            let base = first_day.ok_or_else(|| anyhow::anyhow!("no days loaded"))?;
            let points = weather
                .cumulative_rainfall()
                .into_iter()
                .map(|(d, v)| ((d - base).num_days() as f64, v))
                .collect();
            draw::lines(
                path,
                &Lines {
                    title: "Cumulative Rainfall Over the Year".into(),
                    x_desc: "Date".into(),
                    y_desc: "Cumulative Precipitation (mm)".into(),
                    x_axis: XAxis::Days(base),
                    series: vec![Series {
                        name: "Cumulative Rainfall".into(),
                        points,
                        color: PINK,
                        markers: false,
                    }],
                    fill: true,
                },
                draw::WIDE,
            )
        },
    ));

    jobs.push(requiring(
        weather,
        "monthly_max_temperature_box",
        &[TemperatureMaximum],
        move |path: &Path| {
            draw::box_plot(
                path,
                &BoxPlot {
                    title: "Temperature Distribution by Month".into(),
                    x_desc: "Month".into(),
                    y_desc: "Max Temperature (°C)".into(),
                    groups: monthly_quartiles(weather, TemperatureMaximum),
                    colormap: Colormap::CoolWarm,
                },
                draw::WIDE,
            )
        },
    ));

    if weather.columns.len() > 1 {
        jobs.push(ChartJob::new("weather_correlation_heatmap", move |path: &Path| {
            let (labels, values) = column_correlations(weather);
            draw::heatmap(
                path,
                &Heatmap {
                    title: "Correlation Heatmap".into(),
                    x_desc: String::new(),
                    y_desc: String::new(),
                    x_labels: labels.clone(),
                    y_labels: labels,
                    values,
                    colormap: Colormap::Viridis,
                    scale: Some((-1.0, 1.0)),
                    annotate: Some(2),
                },
                (1000, 800),
            )
        }));
    } else {
        jobs.push(ChartJob::skipped(
            "weather_correlation_heatmap",
            "fewer than two weather columns present",
        ));
    }

    jobs.push(requiring(
        weather,
        "monthly_average_temperatures",
        &[TemperatureMaximum, TemperatureMinimum],
        move |path: &Path| {
            let (months, values) = monthly_temperature_means(weather);
            draw::heatmap(
                path,
                &Heatmap {
                    title: "Monthly Average Temperatures".into(),
                    x_desc: String::new(),
                    y_desc: "Month".into(),
                    x_labels: vec![
                        TemperatureMaximum.header().to_string(),
                        TemperatureMinimum.header().to_string(),
                    ],
                    y_labels: months.iter().map(|m| month_name(*m).to_string()).collect(),
                    values,
                    colormap: Colormap::CoolWarm,
                    scale: None,
                    annotate: Some(1),
                },
                (900, 1000),
            )
        },
    ));

    jobs.push(requiring(
        weather,
        "rainfall_histogram",
        &[PrecipitationTotal],
        move |path: &Path| {
            draw::histogram(
                path,
                &Histogram {
                    title: "Distribution of Daily Rainfall".into(),
                    x_desc: "Precipitation Total (mm)".into(),
                    bins: geometry::histogram(&weather.series(PrecipitationTotal), RAINFALL_BINS),
                    color: ORANGE,
                },
                draw::SIZE,
            )
        },
    ));

    jobs.push(requiring(
        weather,
        "temperature_vs_precipitation",
        &[TemperatureMaximum, PrecipitationTotal],
        move |path: &Path| {
            let points = weather
                .days
                .iter()
                .filter_map(|d| Some((d.get(TemperatureMaximum)?, d.get(PrecipitationTotal)?)))
                .collect();
            draw::scatter(
                path,
                &Scatter {
                    title: "Temperature vs Precipitation Total".into(),
                    x_desc: "Temperature Maximum (°C)".into(),
                    y_desc: "Precipitation Total (mm)".into(),
                    points,
                    color: MAGENTA,
                    alpha: 0.4,
                    fit: None,
                },
                draw::SIZE,
            )
        },
    ));

    jobs
}

/// Render every annual chart into `dir`.
pub fn render(weather: &AnnualWeather, dir: &Path) -> RenderReport {
    batch::run(dir, jobs(weather))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tw_data::annual::AnnualDay;

    fn day(m: u32, d: u32, values: [Option<f64>; 4]) -> AnnualDay {
        AnnualDay::new(NaiveDate::from_ymd_opt(2024, m, d).unwrap(), values)
    }

    fn full() -> AnnualWeather {
        AnnualWeather {
            columns: AnnualColumn::all().to_vec(),
            days: vec![
                day(1, 1, [Some(10.0), Some(2.0), Some(1.0), Some(6.0)]),
                day(1, 2, [Some(12.0), Some(4.0), Some(0.0), Some(8.0)]),
                day(2, 1, [Some(8.0), Some(0.0), Some(3.0), Some(4.0)]),
            ],
        }
    }

    fn rain_only() -> AnnualWeather {
        AnnualWeather {
            columns: vec![AnnualColumn::PrecipitationTotal],
            days: vec![
                day(3, 1, [None, None, Some(4.0), None]),
                day(3, 2, [None, None, Some(1.5), None]),
            ],
        }
    }

    #[test]
    fn test_day_series_offsets() {
        let points = day_series(&full(), AnnualColumn::TemperatureMaximum);
        assert_eq!(points, vec![(0.0, 10.0), (1.0, 12.0), (31.0, 8.0)]);
    }

    #[test]
    fn test_monthly_quartiles_in_calendar_order() {
        let groups = monthly_quartiles(&full(), AnnualColumn::TemperatureMaximum);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "January");
        assert_eq!(groups[0].1.median, 11.0);
        assert_eq!(groups[1].0, "February");
    }

    #[test]
    fn test_column_correlations_square() {
        let (labels, matrix) = column_correlations(&full());
        assert_eq!(labels.len(), 4);
        assert_eq!(matrix.len(), 4);
        assert!((matrix[0][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_monthly_temperature_means() {
        let (months, rows) = monthly_temperature_means(&full());
        assert_eq!(months, vec![1, 2]);
        assert_eq!(rows[0], vec![11.0, 3.0]);
        assert_eq!(rows[1], vec![8.0, 0.0]);
    }

    #[test]
    fn test_missing_columns_are_skipped_jobs() {
        let weather = rain_only();
        let dir = tempfile::TempDir::new().unwrap();
        let unavailable: Vec<String> = jobs(&weather)
            .into_iter()
            .filter(|j| j.name != "cumulative_rainfall" && j.name != "rainfall_histogram")
            .map(|j| j.name)
            .collect();
        assert_eq!(unavailable.len(), 5);

        let report = batch::run(
            dir.path(),
            jobs(&weather)
                .into_iter()
                .filter(|j| j.name == "daily_temperatures" || j.name == "weather_correlation_heatmap")
                .collect(),
        );
        assert!(report.rendered.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed[0].1.contains("Temperature Maximum"));
        assert!(report.failed[0].1.contains("Temperature Minimum"));
        assert_eq!(report.failed[1].1, "fewer than two weather columns present");
    }
}
