//! Global timeline: all matching events over the full dataset range.
//!
//! Drag with the secondary mouse button to select a time range; the
//! selection can be frozen into the comparison candidate list.

use crate::api::types::{HistogramResponse, QueryResponse};
use crate::api::ApiClient;
use crate::fetch::Fetch;
use crate::filter::FiltersState;
use crate::intervals::CandidateInterval;
use chrono::{NaiveDate, TimeZone, Utc};
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, VLine};

const QUERY_FIELDS: [&str; 5] = ["event_id", "area", "length", "severity_index", "start_time"];

const DAY_MS: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimelineMode {
    /// Per-event metric lines.
    Events,
    /// Daily event counts from `/overview-histogram`.
    Counts,
}

pub struct TimelineView {
    mode: TimelineMode,
    pub fetch: Fetch<QueryResponse>,
    pub histogram: Fetch<HistogramResponse>,
    /// Live selection in epoch milliseconds, updated while dragging.
    pub selection: Option<CandidateInterval>,
    drag_anchor: Option<f64>,
}

impl Default for TimelineView {
    fn default() -> Self {
        Self {
            mode: TimelineMode::Events,
            fetch: Fetch::default(),
            histogram: Fetch::default(),
            selection: None,
            drag_anchor: None,
        }
    }
}

impl TimelineView {
    pub fn refresh(&mut self, api: ApiClient, filters: FiltersState, limit: usize) {
        {
            let api = api.clone();
            let filters = filters.clone();
            self.fetch
                .start(move || api.query(&filters, &QUERY_FIELDS, Some(limit)));
        }
        self.histogram.start(move || api.overview_histogram(&filters));
    }

    /// Render the timeline. Returns a frozen copy of the selection when the
    /// save button was clicked this frame.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> Option<CandidateInterval> {
        self.fetch.poll();
        self.histogram.poll();

        let mut saved = None;
        ui.horizontal(|ui| {
            ui.label("Global timeline");
            ui.selectable_value(&mut self.mode, TimelineMode::Events, "events");
            ui.selectable_value(&mut self.mode, TimelineMode::Counts, "daily counts");
            if self.fetch.loading() || self.histogram.loading() {
                ui.spinner();
            }
            if let Some(selection) = self.selection {
                ui.label(selection.label());
                if ui.button("Save interval for comparison").clicked() {
                    saved = Some(selection);
                }
            } else {
                ui.weak("right-drag on the chart to select a range");
            }
        });

        let error = match self.mode {
            TimelineMode::Events => self.fetch.error.as_ref(),
            TimelineMode::Counts => self.histogram.error.as_ref(),
        };
        if let Some(error) = error {
            ui.colored_label(Color32::RED, format!("Error: {error}"));
            return saved;
        }

        let mut lines: Vec<(&str, PlotPoints)> = Vec::new();
        let mut bars: Vec<Bar> = Vec::new();
        match self.mode {
            TimelineMode::Events => {
                let Some(ref data) = self.fetch.data else {
                    if !self.fetch.loading() {
                        ui.weak("No data loaded");
                    }
                    return saved;
                };
                let mut events = data.results.clone();
                events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

                let series: [(&str, fn(&crate::api::types::EventSummary) -> f64); 3] = [
                    ("severity_index", |e| e.severity_index),
                    ("length", |e| e.length),
                    ("area", |e| e.area),
                ];
                for (name, accessor) in series {
                    let points: PlotPoints = events
                        .iter()
                        .map(|e| [e.start_time_ms(), accessor(e)])
                        .collect();
                    lines.push((name, points));
                }
            }
            TimelineMode::Counts => {
                let Some(ref data) = self.histogram.data else {
                    if !self.histogram.loading() {
                        ui.weak("No data loaded");
                    }
                    return saved;
                };
                bars = daily_bars(data);
            }
        }

        let selection = self.selection;
        let plot = Plot::new("global_timeline")
            .legend(Legend::default())
            .height(ui.available_height().max(120.0))
            .x_axis_formatter(|mark, _range| format_timestamp_ms(mark.value));

        let response = plot.show(ui, |plot_ui| {
            for (name, points) in lines {
                plot_ui.line(Line::new(points).name(name));
            }
            if !bars.is_empty() {
                plot_ui.bar_chart(BarChart::new(bars).name("events per day"));
            }

            if let Some(selection) = selection {
                plot_ui.vline(
                    VLine::new(selection.min as f64).color(Color32::from_rgb(255, 149, 0)),
                );
                plot_ui.vline(
                    VLine::new(selection.max as f64).color(Color32::from_rgb(255, 149, 0)),
                );
            }

            let pointer = plot_ui.pointer_coordinate().map(|p| p.x);
            let response = plot_ui.response();
            let dragging = response.dragged_by(egui::PointerButton::Secondary);
            let started = response.drag_started_by(egui::PointerButton::Secondary);
            (pointer, dragging, started)
        });

        let (pointer, dragging, started) = response.inner;
        if started {
            self.drag_anchor = pointer;
        }
        if dragging {
            if let (Some(anchor), Some(current)) = (self.drag_anchor, pointer) {
                let (min, max) = if anchor <= current {
                    (anchor, current)
                } else {
                    (current, anchor)
                };
                if max > min {
                    self.selection = Some(CandidateInterval {
                        min: min as i64,
                        max: max as i64,
                    });
                }
            }
        } else {
            self.drag_anchor = None;
        }

        saved
    }
}

fn format_timestamp_ms(ms: f64) -> String {
    match Utc.timestamp_millis_opt(ms as i64).single() {
        Some(dt) => dt.format("%d.%m.%Y").to_string(),
        None => String::new(),
    }
}

/// Flatten the nested year/month/day counts into bars centered on each day.
/// Keys that do not form a valid calendar date are skipped.
fn daily_bars(histogram: &HistogramResponse) -> Vec<Bar> {
    let mut bars = Vec::new();
    for (year, months) in histogram {
        for (month, days) in months {
            for (day, count) in days {
                let date = match (year.parse(), month.parse(), day.parse()) {
                    (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
                    _ => None,
                };
                let Some(date) = date else { continue };
                let midnight_ms = date
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc().timestamp_millis() as f64)
                    .unwrap_or_default();
                bars.push(Bar::new(midnight_ms + DAY_MS / 2.0, *count as f64).width(DAY_MS * 0.9));
            }
        }
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_bars_skip_malformed_dates() {
        let body = r#"{"2016": {"6": {"1": 4, "31": 2}}, "bogus": {"1": {"1": 9}}}"#;
        let histogram: HistogramResponse = serde_json::from_str(body).unwrap();
        let bars = daily_bars(&histogram);
        // 2016-06-31 does not exist and "bogus" is not a year
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].value, 4.0);
    }

    #[test]
    fn daily_bars_are_centered_on_their_day() {
        let body = r#"{"2016": {"1": {"1": 1}}}"#;
        let histogram: HistogramResponse = serde_json::from_str(body).unwrap();
        let bars = daily_bars(&histogram);
        assert_eq!(bars[0].argument, 1_451_606_400_000.0 + DAY_MS / 2.0);
    }
}
