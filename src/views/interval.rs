//! Interval panel: sortable event table scoped to one comparison interval,
//! with an on-demand detail timeseries for a selected event.

use crate::api::types::{EventDetail, EventSummary, QueryResponse};
use crate::api::ApiClient;
use crate::fetch::Fetch;
use crate::filter::FiltersState;
use crate::intervals::{Interval, IntervalSlot};
use chrono::{TimeZone, Utc};
use egui::Color32;
use egui_extras::{Column, TableBuilder};
use egui_plot::{Line, Plot, PlotPoints};

const QUERY_FIELDS: [&str; 9] = [
    "event_id",
    "area",
    "length",
    "severity_index",
    "start_time",
    "meanLat",
    "meanLon",
    "meanPrec",
    "maxPrec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortColumn {
    EventId,
    Start,
    Length,
    Area,
    SeverityIndex,
}

impl SortColumn {
    fn label(&self) -> &'static str {
        match self {
            SortColumn::EventId => "ID",
            SortColumn::Start => "Start",
            SortColumn::Length => "Length",
            SortColumn::Area => "Area",
            SortColumn::SeverityIndex => "SI",
        }
    }

    fn compare(&self, a: &EventSummary, b: &EventSummary) -> std::cmp::Ordering {
        match self {
            SortColumn::EventId => a.event_id.cmp(&b.event_id),
            SortColumn::Start => a.start_time.total_cmp(&b.start_time),
            SortColumn::Length => a.length.total_cmp(&b.length),
            SortColumn::Area => a.area.total_cmp(&b.area),
            SortColumn::SeverityIndex => a.severity_index.total_cmp(&b.severity_index),
        }
    }
}

pub struct IntervalView {
    slot: IntervalSlot,
    pub table: Fetch<QueryResponse>,
    pub detail: Fetch<EventDetail>,
    selected_event: Option<u64>,
    sort_column: SortColumn,
    sort_ascending: bool,
}

impl IntervalView {
    fn slot_name(&self) -> &'static str {
        match self.slot {
            IntervalSlot::A => "interval_a",
            IntervalSlot::B => "interval_b",
        }
    }

    pub fn new(slot: IntervalSlot) -> Self {
        Self {
            slot,
            table: Fetch::default(),
            detail: Fetch::default(),
            selected_event: None,
            sort_column: SortColumn::EventId,
            sort_ascending: true,
        }
    }

    pub fn refresh(
        &mut self,
        api: ApiClient,
        filters: FiltersState,
        interval: &Interval,
        limit: usize,
    ) {
        let Some((start, end)) = interval.bounds() else {
            self.table.clear();
            self.detail.clear();
            self.selected_event = None;
            return;
        };
        let start_iso = start.to_rfc3339();
        let end_iso = end.to_rfc3339();
        self.table.start(move || {
            api.query_interval(&filters, &start_iso, &end_iso, &QUERY_FIELDS, Some(limit))
        });
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, api: &ApiClient, interval: &Interval) {
        self.table.poll();
        self.detail.poll();

        ui.horizontal(|ui| {
            if let Some(label) = interval.label() {
                ui.label(label);
            }
            if self.table.loading() {
                ui.spinner();
            }
        });

        if !interval.is_set() {
            ui.weak("No interval assigned. Save a range on the global timeline and assign it here.");
            return;
        }

        if let Some(ref error) = self.table.error {
            ui.colored_label(Color32::RED, format!("Error: {error}"));
            return;
        }

        let Some(data) = self.table.data.clone() else {
            return;
        };

        ui.label(format!("{} events", data.count));

        let mut events = data.results;
        events.sort_by(|a, b| self.sort_column.compare(a, b));
        if !self.sort_ascending {
            events.reverse();
        }

        let mut clicked_event = None;
        let table_height = if self.selected_event.is_some() {
            ui.available_height() * 0.6
        } else {
            ui.available_height()
        };

        egui::ScrollArea::horizontal()
            .id_salt((self.slot_name(), "table"))
            .show(ui, |ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .max_scroll_height(table_height.max(100.0))
                    .column(Column::auto().at_least(48.0))
                    .column(Column::auto().at_least(110.0))
                    .column(Column::auto().at_least(56.0))
                    .column(Column::auto().at_least(64.0))
                    .column(Column::auto().at_least(48.0))
                    .column(Column::auto().at_least(70.0))
                    .column(Column::remainder().at_least(70.0))
                    .header(20.0, |mut header| {
                        for column in [
                            SortColumn::EventId,
                            SortColumn::Start,
                            SortColumn::Length,
                            SortColumn::Area,
                            SortColumn::SeverityIndex,
                        ] {
                            header.col(|ui| {
                                let marker = if self.sort_column == column {
                                    if self.sort_ascending {
                                        " ▲"
                                    } else {
                                        " ▼"
                                    }
                                } else {
                                    ""
                                };
                                if ui
                                    .button(format!("{}{marker}", column.label()))
                                    .clicked()
                                {
                                    if self.sort_column == column {
                                        self.sort_ascending = !self.sort_ascending;
                                    } else {
                                        self.sort_column = column;
                                        self.sort_ascending = true;
                                    }
                                }
                            });
                        }
                        header.col(|ui| {
                            ui.label("Mean Lat.");
                        });
                        header.col(|ui| {
                            ui.label("Mean Lon.");
                        });
                    })
                    .body(|body| {
                        body.rows(18.0, events.len(), |mut row| {
                            let event = &events[row.index()];
                            row.col(|ui| {
                                if ui.link(event.event_id.to_string()).clicked() {
                                    clicked_event = Some(event.event_id);
                                }
                            });
                            row.col(|ui| {
                                ui.label(format_start_time(event.start_time));
                            });
                            row.col(|ui| {
                                ui.label(format!("{}h", event.length));
                            });
                            row.col(|ui| {
                                ui.label(format!("{:.2}", event.area));
                            });
                            row.col(|ui| {
                                ui.label(format!("{:.3}", event.severity_index));
                            });
                            row.col(|ui| {
                                ui.label(format_optional(event.mean_lat));
                            });
                            row.col(|ui| {
                                ui.label(format_optional(event.mean_lon));
                            });
                        });
                    });
            });

        if let Some(event_id) = clicked_event {
            self.selected_event = Some(event_id);
            let api = api.clone();
            self.detail.start(move || api.detail(event_id));
        }

        if let Some(event_id) = self.selected_event {
            ui.separator();
            self.detail_section(ui, event_id);
        }
    }

    fn detail_section(&mut self, ui: &mut egui::Ui, event_id: u64) {
        ui.horizontal(|ui| {
            ui.label(format!("Event {event_id}"));
            if self.detail.loading() {
                ui.spinner();
            }
            if ui.small_button("✖").clicked() {
                self.selected_event = None;
                self.detail.clear();
                return;
            }
        });

        if let Some(ref error) = self.detail.error {
            ui.colored_label(Color32::RED, format!("Error: {error}"));
            return;
        }

        let Some(ref detail) = self.detail.data else {
            return;
        };

        let severity: PlotPoints = detail
            .timeseries
            .iter()
            .enumerate()
            .map(|(i, point)| [i as f64, point.severity_index])
            .collect();
        let area: PlotPoints = detail
            .timeseries
            .iter()
            .enumerate()
            .map(|(i, point)| [i as f64, point.area])
            .collect();

        Plot::new((self.slot_name(), "detail", event_id))
            .height(ui.available_height().max(80.0))
            .legend(egui_plot::Legend::default())
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new(severity).name("severity_index"));
                plot_ui.line(Line::new(area).name("area"));
            });
    }
}

fn format_start_time(unix_seconds: f64) -> String {
    match Utc.timestamp_opt(unix_seconds as i64, 0).single() {
        Some(dt) => dt.format("%d.%m.%Y %H:%M").to_string(),
        None => unix_seconds.to_string(),
    }
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "—".to_string(),
    }
}
