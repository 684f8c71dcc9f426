//! Main application state and UI.
//!
//! `DashboardApp` is the single owner of all state slices (filters,
//! comparison intervals, candidate ranges, panel visibility, settings).
//! Views receive only the slices they render; every mutation happens here.

use crate::api::types::QueryResponse;
use crate::api::ApiClient;
use crate::fetch::Fetch;
use crate::filter::{ConditionPatch, FieldKind, FieldName, FilterValue, FiltersState, Operator};
use crate::intervals::{Assignment, ComparisonState, IntervalSlot};
use crate::layout::{self, LayoutId, PanelId, PanelVisibility};
use crate::session::Snapshot;
use crate::settings::Settings;
use crate::views::{ComparisonView, IntervalView, TimelineView};
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use eframe::egui::{self, Align, Color32, Layout, RichText, UiBuilder};
use std::collections::HashMap;

/// Transient state of the filter dialog while it is open.
struct FilterDialog {
    /// Filters as they were when the dialog opened; restored on Cancel.
    backup: FiltersState,
    /// In-progress timestamp text per condition row. Committed to the
    /// filter state only once it parses.
    timestamp_edits: HashMap<(FieldName, usize), String>,
}

enum PanelAction {
    Maximize(PanelId),
    Close(PanelId),
}

pub struct DashboardApp {
    settings: Settings,
    api: ApiClient,

    filters: FiltersState,
    comparison: ComparisonState,
    visibility: PanelVisibility,
    layout: LayoutId,

    timeline: TimelineView,
    comparison_view: ComparisonView,
    interval_a_view: IntervalView,
    interval_b_view: IntervalView,

    /// Total matching events for the header, fetched with `limit=0`.
    count: Fetch<QueryResponse>,
    health: Fetch<()>,

    filter_dialog: Option<FilterDialog>,
    /// Candidate index waiting for an explicit overwrite target.
    pending_assignment: Option<usize>,
    candidates_open: bool,
    settings_open: bool,
    status: Option<String>,

    /// Set when filters changed this frame; triggers a refetch of every
    /// filter-dependent view at the end of `update`.
    filters_dirty: bool,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = Settings::load();
        let api = ApiClient::new(&settings.base_url);

        let mut filters = FiltersState::default();
        for field in FieldName::all() {
            filters.add_filter(field);
        }

        let visibility = PanelVisibility::default();
        let mut app = Self {
            layout: layout::resolve_layout(visibility),
            visibility,
            settings,
            api,
            filters,
            comparison: ComparisonState::default(),
            timeline: TimelineView::default(),
            comparison_view: ComparisonView::default(),
            interval_a_view: IntervalView::new(IntervalSlot::A),
            interval_b_view: IntervalView::new(IntervalSlot::B),
            count: Fetch::default(),
            health: Fetch::default(),
            filter_dialog: None,
            pending_assignment: None,
            candidates_open: false,
            settings_open: false,
            status: None,
            filters_dirty: false,
        };

        let api = app.api.clone();
        app.health.start(move || api.health());
        app.refresh_all();
        app
    }

    /// Refetch everything that depends on the filter state.
    fn refresh_all(&mut self) {
        let limit = self.settings.query_limit;
        self.timeline
            .refresh(self.api.clone(), self.filters.clone(), limit);
        self.comparison_view.refresh(
            self.api.clone(),
            self.filters.clone(),
            limit,
            self.settings.bins,
        );
        self.refresh_intervals();

        let api = self.api.clone();
        let filters = self.filters.clone();
        self.count
            .start(move || api.query(&filters, &["event_id"], Some(0)));
    }

    /// Refetch the interval-scoped views and the radar summaries.
    fn refresh_intervals(&mut self) {
        let limit = self.settings.query_limit;
        self.interval_a_view.refresh(
            self.api.clone(),
            self.filters.clone(),
            &self.comparison.interval_a,
            limit,
        );
        self.interval_b_view.refresh(
            self.api.clone(),
            self.filters.clone(),
            &self.comparison.interval_b,
            limit,
        );
        self.comparison_view
            .refresh_spiders(&self.api, &self.filters, &self.comparison);
    }

    fn header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Rainfall Events");

            match (&self.health.data, &self.health.error) {
                (Some(()), _) => {
                    ui.colored_label(Color32::from_rgb(34, 197, 94), "●")
                        .on_hover_text("service reachable");
                }
                (None, Some(error)) => {
                    ui.colored_label(Color32::RED, "●")
                        .on_hover_text(format!("service unreachable: {error}"));
                }
                (None, None) => {
                    ui.spinner();
                }
            }

            if let Some(ref data) = self.count.data {
                ui.label(format!("{} events match", data.count));
            } else if self.count.loading() {
                ui.spinner();
            }

            ui.separator();
            ui.menu_button("Windows", |ui| {
                for panel in PanelId::all() {
                    let mut visible = self.visibility.is_visible(panel);
                    if ui.checkbox(&mut visible, panel.label()).changed() {
                        self.visibility.set_visible(panel, visible);
                        self.layout = layout::resolve_layout(self.visibility);
                    }
                }
                ui.separator();
                ui.checkbox(&mut self.settings.timeline_enabled, "Global timeline");
            });

            if ui.button("Filters…").clicked() && self.filter_dialog.is_none() {
                self.filter_dialog = Some(FilterDialog {
                    backup: self.filters.clone(),
                    timestamp_edits: HashMap::new(),
                });
            }
            if ui.button("Intervals…").clicked() {
                self.candidates_open = !self.candidates_open;
            }
            if ui.button("Settings…").clicked() {
                self.settings_open = !self.settings_open;
            }

            ui.separator();
            if ui.button("Save state").clicked() {
                self.save_snapshot();
            }
            if ui.button("Restore state").clicked() {
                self.restore_snapshot();
            }
            if let Some(ref status) = self.status {
                ui.weak(status);
            }
        });

        self.filter_chips(ui);
    }

    /// One removable chip per enabled condition.
    fn filter_chips(&mut self, ui: &mut egui::Ui) {
        let mut to_delete = None;
        ui.horizontal_wrapped(|ui| {
            for (field, filter) in self.filters.iter() {
                for (index, condition) in filter.conditions.iter().enumerate() {
                    if !condition.enabled {
                        continue;
                    }
                    let text = format!(
                        "{} {} {}",
                        filter.label,
                        condition.operator.symbol(),
                        condition.value.serialize_for_query()
                    );
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(text).small());
                        if ui.small_button("✖").clicked() {
                            to_delete = Some((field, index));
                        }
                    });
                }
            }
        });
        if let Some((field, index)) = to_delete {
            self.filters.delete_condition(field, index);
            self.filters_dirty = true;
        }
    }

    fn filter_dialog_window(&mut self, ctx: &egui::Context) {
        let Some(mut dialog) = self.filter_dialog.take() else {
            return;
        };
        let mut keep_open = true;

        egui::Window::new("Filters")
            .collapsible(false)
            .resizable(true)
            .show(ctx, |ui| {
                let addable = self.filters.addable_fields();
                if !addable.is_empty() {
                    egui::ComboBox::from_id_salt("add_filter_field")
                        .selected_text("Filter by...")
                        .show_ui(ui, |ui| {
                            for field in addable {
                                if ui.button(field.label()).clicked() {
                                    self.filters.add_filter(field);
                                    ui.close_menu();
                                }
                            }
                        });
                    ui.separator();
                }

                let snapshot: Vec<(FieldName, Vec<crate::filter::FilterCondition>)> = self
                    .filters
                    .iter()
                    .map(|(field, filter)| (field, filter.conditions.clone()))
                    .collect();

                for (field, conditions) in snapshot {
                    ui.label(RichText::new(field.label()).strong());
                    for (index, condition) in conditions.iter().enumerate() {
                        self.condition_row(ui, &mut dialog, field, index, condition);
                    }
                    if ui.small_button("+ condition").clicked() {
                        self.filters.add_condition(field);
                    }
                    ui.separator();
                }

                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        self.filters_dirty = true;
                        keep_open = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.filters = dialog.backup.clone();
                        keep_open = false;
                    }
                });
            });

        if keep_open {
            self.filter_dialog = Some(dialog);
        }
    }

    fn condition_row(
        &mut self,
        ui: &mut egui::Ui,
        dialog: &mut FilterDialog,
        field: FieldName,
        index: usize,
        condition: &crate::filter::FilterCondition,
    ) {
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt((field, index, "operator"))
                .selected_text(condition.operator.symbol())
                .width(52.0)
                .show_ui(ui, |ui| {
                    for operator in Operator::all() {
                        if ui
                            .selectable_label(condition.operator == operator, operator.symbol())
                            .clicked()
                        {
                            self.filters.update_condition(
                                field,
                                index,
                                ConditionPatch {
                                    operator: Some(operator),
                                    ..Default::default()
                                },
                            );
                        }
                    }
                });

            match (field.kind(), condition.value) {
                (FieldKind::Numeric { min, max, step }, FilterValue::Number(n)) => {
                    let mut value = n;
                    if ui
                        .add(egui::DragValue::new(&mut value).speed(step).range(min..=max))
                        .changed()
                    {
                        self.filters.update_condition(
                            field,
                            index,
                            ConditionPatch {
                                value: Some(FilterValue::Number(value)),
                                ..Default::default()
                            },
                        );
                    }
                }
                (_, value) => {
                    let key = (field, index);
                    let buffer = dialog
                        .timestamp_edits
                        .entry(key)
                        .or_insert_with(|| timestamp_input_text(value));
                    let parsed = parse_timestamp_input(buffer);
                    let edit = egui::TextEdit::singleline(buffer)
                        .desired_width(150.0)
                        .text_color_opt(if parsed.is_none() {
                            Some(Color32::RED)
                        } else {
                            None
                        });
                    if ui.add(edit).changed() {
                        if let Some(ms) = parse_timestamp_input(buffer) {
                            self.filters.update_condition(
                                field,
                                index,
                                ConditionPatch {
                                    value: Some(FilterValue::Timestamp(ms)),
                                    ..Default::default()
                                },
                            );
                        }
                    }
                }
            }

            let mut enabled = condition.enabled;
            if ui.checkbox(&mut enabled, "enabled").changed() {
                self.filters.update_condition(
                    field,
                    index,
                    ConditionPatch {
                        enabled: Some(enabled),
                        ..Default::default()
                    },
                );
            }

            if ui.small_button("✖").clicked() {
                self.filters.delete_condition(field, index);
                dialog.timestamp_edits.retain(|(f, _), _| *f != field);
            }
        });
    }

    fn candidates_window(&mut self, ctx: &egui::Context) {
        if !self.candidates_open {
            return;
        }
        let mut open = true;
        let mut assigned = false;

        egui::Window::new("Saved intervals")
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                for slot in [IntervalSlot::A, IntervalSlot::B] {
                    let name = match slot {
                        IntervalSlot::A => "A",
                        IntervalSlot::B => "B",
                    };
                    let label = self.comparison.interval(slot).label();
                    ui.horizontal(|ui| {
                        ui.label(format!("Interval {name}:"));
                        match label {
                            Some(label) => {
                                ui.label(label);
                                if ui.small_button("clear").clicked() {
                                    match slot {
                                        IntervalSlot::A => self.comparison.interval_a.clear(),
                                        IntervalSlot::B => self.comparison.interval_b.clear(),
                                    }
                                    assigned = true;
                                }
                            }
                            None => {
                                ui.weak("not set");
                            }
                        }
                    });
                }
                ui.separator();

                if self.comparison.candidates.is_empty() {
                    ui.weak("No saved ranges. Right-drag on the global timeline.");
                }
                let mut delete = None;
                let mut assign = None;
                for (index, candidate) in self.comparison.candidates.iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(candidate.label());
                        if ui.small_button("Assign").clicked() {
                            assign = Some(index);
                        }
                        if ui.small_button("Delete").clicked() {
                            delete = Some(index);
                        }
                    });
                }
                if let Some(index) = assign {
                    match self.comparison.assign_candidate(index) {
                        Some(Assignment::Placed(_)) => assigned = true,
                        Some(Assignment::NeedsChoice) => {
                            self.pending_assignment = Some(index);
                        }
                        None => {}
                    }
                }
                if let Some(index) = delete {
                    self.comparison.delete_candidate(index);
                }
            });

        self.candidates_open = open;
        if assigned {
            self.refresh_intervals();
        }
    }

    /// Both intervals are occupied: ask which one to overwrite.
    fn assignment_prompt(&mut self, ctx: &egui::Context) {
        let Some(index) = self.pending_assignment else {
            return;
        };
        let mut assigned = false;

        egui::Window::new("Both intervals are set")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Which interval should this range replace?");
                ui.horizontal(|ui| {
                    if ui.button("Overwrite A").clicked() {
                        assigned = self.comparison.assign_candidate_to(index, IntervalSlot::A);
                        self.pending_assignment = None;
                    }
                    if ui.button("Overwrite B").clicked() {
                        assigned = self.comparison.assign_candidate_to(index, IntervalSlot::B);
                        self.pending_assignment = None;
                    }
                    if ui.button("Cancel").clicked() {
                        self.pending_assignment = None;
                    }
                });
            });

        if assigned {
            self.refresh_intervals();
        }
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }
        let mut open = true;
        let mut apply = false;

        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Service URL");
                    ui.text_edit_singleline(&mut self.settings.base_url);
                    ui.end_row();

                    ui.label("Query limit");
                    ui.add(egui::DragValue::new(&mut self.settings.query_limit).speed(100));
                    ui.end_row();

                    ui.label("Chart bins");
                    ui.add(egui::DragValue::new(&mut self.settings.bins).range(1..=200));
                    ui.end_row();

                    ui.label("Min events per bin");
                    ui.add(egui::DragValue::new(&mut self.settings.min_entries_per_bin));
                    ui.end_row();

                    ui.label("Quantile");
                    ui.add(
                        egui::DragValue::new(&mut self.settings.stat_quantile)
                            .speed(0.001)
                            .range(0.0..=1.0),
                    );
                    ui.end_row();

                    ui.label("Outlier quantile");
                    ui.add(
                        egui::DragValue::new(&mut self.settings.outlier_quantile)
                            .speed(0.001)
                            .range(0.0..=1.0),
                    );
                    ui.end_row();
                });

                if ui.button("Apply and save").clicked() {
                    apply = true;
                }
            });

        self.settings_open = open;
        if apply {
            self.settings.save();
            self.api = ApiClient::new(&self.settings.base_url);
            let api = self.api.clone();
            self.health.start(move || api.health());
            self.filters_dirty = true;
        }
    }

    fn save_snapshot(&mut self) {
        let Some(path) = Settings::snapshot_path() else {
            self.status = Some("no config directory available".to_string());
            return;
        };
        let snapshot = Snapshot::new(
            self.filters.clone(),
            self.comparison.interval_a,
            self.comparison.interval_b,
            self.comparison.candidates.clone(),
            self.visibility,
        );
        self.status = Some(match snapshot.save_to(&path) {
            Ok(()) => format!("state saved to {}", path.display()),
            Err(e) => {
                tracing::error!(error = %e, "snapshot save failed");
                format!("save failed: {e}")
            }
        });
    }

    /// Validate first, then apply every slice; a bad file changes nothing.
    fn restore_snapshot(&mut self) {
        let Some(path) = Settings::snapshot_path() else {
            self.status = Some("no config directory available".to_string());
            return;
        };
        match Snapshot::load_from(&path) {
            Ok(snapshot) => {
                self.filters = snapshot.filters;
                self.comparison.interval_a = snapshot.interval_a;
                self.comparison.interval_b = snapshot.interval_b;
                self.comparison.candidates = snapshot.candidates;
                self.visibility = snapshot.visibility;
                self.layout = layout::resolve_layout(self.visibility);
                self.filters_dirty = true;
                self.status = Some("state restored".to_string());
            }
            Err(e) => {
                tracing::error!(error = %e, "snapshot restore failed");
                self.status = Some(format!("restore failed: {e}"));
            }
        }
    }

    fn panels(&mut self, ui: &mut egui::Ui) {
        if self.visibility.none_visible() {
            ui.centered_and_justified(|ui| {
                ui.label("All windows are hidden. Re-enable them from the Windows menu.");
            });
            return;
        }

        let viewport = ui.max_rect();
        let mut action = None;

        for panel in PanelId::all() {
            if !self.visibility.is_visible(panel) {
                continue;
            }
            let inset = self.layout.panel_region(panel);
            if inset.is_collapsed() {
                continue;
            }
            let rect = inset.rect_in(viewport).shrink(2.0);

            ui.allocate_new_ui(UiBuilder::new().max_rect(rect), |ui| {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.set_min_size(ui.available_size());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(panel.label()).strong());
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            if ui.small_button("✖").clicked() {
                                action = Some(PanelAction::Close(panel));
                            }
                            if ui.small_button("🗖").clicked() {
                                action = Some(PanelAction::Maximize(panel));
                            }
                        });
                    });
                    ui.separator();
                    self.panel_body(panel, ui);
                });
            });
        }

        match action {
            Some(PanelAction::Maximize(panel)) => {
                self.layout = layout::maximize(panel);
                self.visibility = PanelVisibility::for_layout(self.layout);
            }
            Some(PanelAction::Close(panel)) => {
                self.layout = layout::close(self.visibility, panel);
                self.visibility = PanelVisibility::for_layout(self.layout);
            }
            None => {}
        }
    }

    fn panel_body(&mut self, panel: PanelId, ui: &mut egui::Ui) {
        match panel {
            PanelId::Comparison => {
                self.comparison_view
                    .ui(ui, &self.settings, &self.comparison)
            }
            PanelId::IntervalA => {
                self.interval_a_view
                    .ui(ui, &self.api, &self.comparison.interval_a)
            }
            PanelId::IntervalB => {
                self.interval_b_view
                    .ui(ui, &self.api, &self.comparison.interval_b)
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.count.poll();
        self.health.poll();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            self.header(ui);
        });

        if self.settings.timeline_enabled {
            egui::TopBottomPanel::bottom("timeline")
                .resizable(true)
                .default_height(200.0)
                .show(ctx, |ui| {
                    if let Some(candidate) = self.timeline.ui(ui) {
                        self.comparison.save_candidate(candidate);
                        self.candidates_open = true;
                    }
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.panels(ui);
        });

        self.filter_dialog_window(ctx);
        self.candidates_window(ctx);
        self.assignment_prompt(ctx);
        self.settings_window(ctx);

        if self.filters_dirty {
            self.filters_dirty = false;
            self.refresh_all();
        }

        // Keep polling while requests are in flight.
        if self.count.loading()
            || self.timeline.fetch.loading()
            || self.comparison_view.rows.loading()
            || self.interval_a_view.table.loading()
            || self.interval_b_view.table.loading()
        {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

fn timestamp_input_text(value: FilterValue) -> String {
    match value {
        FilterValue::Timestamp(ms) => match Utc.timestamp_millis_opt(ms).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => ms.to_string(),
        },
        FilterValue::Number(n) => n.to_string(),
    }
}

/// Accepts `YYYY-MM-DD HH:MM` or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_timestamp_input(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_input_round_trips() {
        let ms = parse_timestamp_input("2016-06-01 12:30").unwrap();
        let text = timestamp_input_text(FilterValue::Timestamp(ms));
        assert_eq!(text, "2016-06-01 12:30");
    }

    #[test]
    fn bare_date_parses_to_midnight() {
        assert_eq!(
            parse_timestamp_input("2016-01-01"),
            Some(1_451_606_400_000)
        );
        assert_eq!(parse_timestamp_input("  2016-01-01  "), Some(1_451_606_400_000));
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp_input("yesterday").is_none());
        assert!(parse_timestamp_input("2016-13-01").is_none());
    }
}
