//! Native dashboard for exploring detected heavy rainfall events.
//!
//! Talks to the query/aggregation HTTP service and renders filterable
//! timelines, interval comparisons and per-event detail views.

mod api;
mod app;
mod fetch;
mod filter;
mod intervals;
mod layout;
mod session;
mod settings;
mod stats;
mod views;

use eframe::egui;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Rainfall Events"),
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native(
        "Rainfall Events",
        options,
        Box::new(|cc| Ok(Box::new(app::DashboardApp::new(cc)))),
    )
}
