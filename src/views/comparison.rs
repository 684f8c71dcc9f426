//! Comparison panel: development of a chosen metric over the whole filtered
//! dataset, plus a radar comparison of intervals A and B.
//!
//! The development chart is computed client-side from raw query rows with
//! the statistics helper, so it stays consistent with whatever filter state
//! is active without another server round trip.

use crate::api::types::{EventSummary, OverviewResponse, QueryResponse, SpiderStats};
use crate::api::ApiClient;
use crate::fetch::Fetch;
use crate::filter::{FieldName, FiltersState};
use crate::intervals::ComparisonState;
use crate::settings::Settings;
use crate::stats;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text};

const QUERY_FIELDS: [&str; 5] = ["event_id", "area", "length", "severity_index", "start_time"];

/// Overview timestamps arrive as strings; accept full RFC 3339 or a bare
/// date.
fn parse_time_ms(value: &str) -> Option<f64> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis() as f64);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis() as f64);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis() as f64);
    }
    None
}

/// Metrics selectable for the development chart (the start time axis is not
/// a metric).
const METRIC_FIELDS: [FieldName; 3] = [FieldName::Area, FieldName::Length, FieldName::SeverityIndex];

fn metric_value(event: &EventSummary, field: FieldName) -> f64 {
    match field {
        FieldName::Area => event.area,
        FieldName::Length => event.length,
        FieldName::SeverityIndex => event.severity_index,
        FieldName::StartTime => event.start_time,
    }
}

/// Where the development chart gets its statistics from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartSource {
    /// Binned client-side from raw query rows.
    Client,
    /// Pre-binned by the `/overview` endpoint.
    Server,
}

pub struct ComparisonView {
    pub field: FieldName,
    source: ChartSource,
    pub rows: Fetch<QueryResponse>,
    pub overview: Fetch<OverviewResponse>,
    pub spider_a: Fetch<SpiderStats>,
    pub spider_b: Fetch<SpiderStats>,
}

impl Default for ComparisonView {
    fn default() -> Self {
        Self {
            field: FieldName::Area,
            source: ChartSource::Client,
            rows: Fetch::default(),
            overview: Fetch::default(),
            spider_a: Fetch::default(),
            spider_b: Fetch::default(),
        }
    }
}

impl ComparisonView {
    pub fn refresh(&mut self, api: ApiClient, filters: FiltersState, limit: usize, bins: usize) {
        {
            let api = api.clone();
            let filters = filters.clone();
            self.rows
                .start(move || api.query(&filters, &QUERY_FIELDS, Some(limit)));
        }
        self.overview.start(move || api.overview(&filters, bins));
    }

    /// Re-fetch the radar summaries for whichever intervals are set.
    pub fn refresh_spiders(
        &mut self,
        api: &ApiClient,
        filters: &FiltersState,
        comparison: &ComparisonState,
    ) {
        match comparison.interval_a.bounds() {
            Some((start, end)) => {
                let api = api.clone();
                let filters = filters.clone();
                self.spider_a.start(move || {
                    api.spider(&filters, &start.to_rfc3339(), &end.to_rfc3339())
                });
            }
            None => self.spider_a.clear(),
        }
        match comparison.interval_b.bounds() {
            Some((start, end)) => {
                let api = api.clone();
                let filters = filters.clone();
                self.spider_b.start(move || {
                    api.spider(&filters, &start.to_rfc3339(), &end.to_rfc3339())
                });
            }
            None => self.spider_b.clear(),
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, settings: &Settings, comparison: &ComparisonState) {
        self.rows.poll();
        self.overview.poll();
        self.spider_a.poll();
        self.spider_b.poll();

        ui.horizontal(|ui| {
            ui.label("Metric:");
            egui::ComboBox::from_id_salt("comparison_field")
                .selected_text(self.field.label())
                .show_ui(ui, |ui| {
                    for field in METRIC_FIELDS {
                        ui.selectable_value(&mut self.field, field, field.label());
                    }
                });
            ui.selectable_value(&mut self.source, ChartSource::Client, "client bins");
            ui.selectable_value(&mut self.source, ChartSource::Server, "server bins");
            if self.rows.loading() || self.overview.loading() {
                ui.spinner();
            }
        });

        match self.source {
            ChartSource::Client => {
                if let Some(ref error) = self.rows.error {
                    ui.colored_label(Color32::RED, format!("Error: {error}"));
                } else {
                    self.development_chart(ui, settings);
                }
            }
            ChartSource::Server => {
                if let Some(ref error) = self.overview.error {
                    ui.colored_label(Color32::RED, format!("Error: {error}"));
                } else {
                    self.overview_chart(ui);
                }
            }
        }

        ui.separator();
        self.radar_chart(ui, comparison);
    }

    /// Mean, high quantile and outliers of the selected metric, binned over
    /// time.
    fn development_chart(&self, ui: &mut egui::Ui, settings: &Settings) {
        let Some(ref data) = self.rows.data else {
            if !self.rows.loading() {
                ui.weak("No data loaded");
            }
            return;
        };

        let mut events = data.results.clone();
        events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        if events.is_empty() {
            ui.weak("No events match the current filters");
            return;
        }

        let field = self.field;
        let key = move |e: &EventSummary| metric_value(e, field);

        let bins = stats::bin_count(events.len(), settings.bins, settings.min_entries_per_bin);
        let mut mean_points = Vec::new();
        let mut quantile_points = Vec::new();
        for chunk in stats::chunks(&events, bins) {
            if chunk.is_empty() {
                continue;
            }
            let x = chunk[0].start_time_ms();
            mean_points.push([x, stats::mean(&chunk, key)]);
            quantile_points.push([x, stats::quantile(&chunk, key, settings.stat_quantile)]);
        }

        let outlier_points: Vec<[f64; 2]> = stats::outlier(&events, key, settings.outlier_quantile)
            .iter()
            .map(|e| [e.start_time_ms(), key(e)])
            .collect();

        let quantile_label = format!("{:.0}% quantile", settings.stat_quantile * 100.0);
        let outlier_label = format!("outliers (> {:.1}%)", settings.outlier_quantile * 100.0);

        Plot::new("development_chart")
            .legend(Legend::default())
            .height((ui.available_height() * 0.55).max(160.0))
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new(PlotPoints::from(mean_points)).name("mean"));
                plot_ui.line(Line::new(PlotPoints::from(quantile_points)).name(quantile_label));
                plot_ui.points(
                    Points::new(PlotPoints::from(outlier_points))
                        .radius(3.0)
                        .name(outlier_label),
                );
            });
    }

    /// Same chart, but from the pre-binned `/overview` response.
    fn overview_chart(&self, ui: &mut egui::Ui) {
        let Some(ref data) = self.overview.data else {
            if !self.overview.loading() {
                ui.weak("No overview loaded");
            }
            return;
        };

        let field = self.field.wire_name();
        let stat = data.stat.get(field).map(Vec::as_slice).unwrap_or(&[]);
        let outliers = data.outliers.get(field).map(Vec::as_slice).unwrap_or(&[]);
        if stat.is_empty() {
            ui.weak("Server overview has no bins for this metric");
            return;
        }

        let mut mean_points = Vec::with_capacity(stat.len());
        let mut quantile_points = Vec::with_capacity(stat.len());
        for point in stat {
            let Some(x) = parse_time_ms(&point.start_time) else {
                continue;
            };
            mean_points.push([x, point.mean]);
            quantile_points.push([x, point.quantile]);
        }
        let outlier_points: Vec<[f64; 2]> = outliers
            .iter()
            .filter_map(|o| Some([parse_time_ms(&o.start)?, o.value]))
            .collect();

        Plot::new("overview_chart")
            .legend(Legend::default())
            .height((ui.available_height() * 0.55).max(160.0))
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new(PlotPoints::from(mean_points)).name("mean"));
                plot_ui.line(Line::new(PlotPoints::from(quantile_points)).name("quantile"));
                plot_ui.points(
                    Points::new(PlotPoints::from(outlier_points))
                        .radius(3.0)
                        .name("outliers"),
                );
            });
    }

    /// Radar polygon comparing interval A and B summary statistics.
    fn radar_chart(&self, ui: &mut egui::Ui, comparison: &ComparisonState) {
        for (slot, fetch) in [("A", &self.spider_a), ("B", &self.spider_b)] {
            if let Some(ref error) = fetch.error {
                ui.colored_label(Color32::RED, format!("Interval {slot}: {error}"));
            }
        }

        let (Some(stats_a), Some(stats_b)) = (&self.spider_a.data, &self.spider_b.data) else {
            if self.spider_a.loading() || self.spider_b.loading() {
                ui.spinner();
            } else {
                ui.weak("Assign both comparison intervals to see the radar comparison");
            }
            return;
        };

        // Normalize each axis against the pairwise maximum so both polygons
        // fit the unit circle.
        let axes_a = stats_a.axes();
        let axes_b = stats_b.axes();
        let max: Vec<f64> = axes_a
            .iter()
            .zip(axes_b.iter())
            .map(|(a, b)| a.max(*b).max(f64::MIN_POSITIVE))
            .collect();

        let vertex = |i: usize, value: f64| -> [f64; 2] {
            let angle = std::f64::consts::TAU * i as f64 / axes_a.len() as f64
                + std::f64::consts::FRAC_PI_2;
            [value * angle.cos(), value * angle.sin()]
        };

        let polygon_points = |axes: &[f64; 5]| -> Vec<[f64; 2]> {
            axes.iter()
                .enumerate()
                .map(|(i, v)| vertex(i, v / max[i]))
                .collect()
        };

        let label_a = comparison.interval_a.label().unwrap_or_else(|| "Interval A".into());
        let label_b = comparison.interval_b.label().unwrap_or_else(|| "Interval B".into());

        Plot::new("radar_chart")
            .legend(Legend::default())
            .data_aspect(1.0)
            .show_axes(false)
            .show_grid(false)
            .height(ui.available_height().max(160.0))
            .show(ui, |plot_ui| {
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(polygon_points(&axes_a)))
                        .stroke(egui::Stroke::new(1.5, Color32::from_rgb(59, 130, 246)))
                        .name(label_a),
                );
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(polygon_points(&axes_b)))
                        .stroke(egui::Stroke::new(1.5, Color32::from_rgb(34, 197, 94)))
                        .name(label_b),
                );
                for (i, label) in SpiderStats::AXIS_LABELS.iter().enumerate() {
                    let [x, y] = vertex(i, 1.15);
                    plot_ui.text(Text::new(PlotPoint::new(x, y), *label));
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::parse_time_ms;

    #[test]
    fn overview_timestamps_parse_in_all_served_shapes() {
        let expected = Some(1_451_606_400_000.0);
        assert_eq!(parse_time_ms("2016-01-01"), expected);
        assert_eq!(parse_time_ms("2016-01-01 00:00:00"), expected);
        assert_eq!(parse_time_ms("2016-01-01T00:00:00Z"), expected);
        assert_eq!(parse_time_ms("not a date"), None);
    }
}
