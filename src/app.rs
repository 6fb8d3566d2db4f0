use eframe::egui::{self, Ui};

use crate::state::{AppState, Page};
use crate::ui::{panels, plot, table, upload};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: navigation + filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: current page ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.page {
            Page::Explore => explore_page(ui, &self.state),
            Page::Upload => upload::upload_page(ui, &mut self.state),
        });
    }
}

fn explore_page(ui: &mut Ui, state: &AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading("The Dynamic Database of Molecular Transport Properties in Soft Materials");
    });
    ui.label("This page allows users to explore molecular transport properties in soft materials.");

    if state.total_rows == 0 {
        ui.colored_label(
            egui::Color32::from_rgb(200, 140, 0),
            "No data available! Please upload data in the 'Upload Data' page first.",
        );
        return;
    }

    let plot_height = (ui.available_height() * 0.55).max(200.0);
    plot::scatter_plot(ui, state, plot_height);

    ui.separator();
    ui.heading("Filtered Data Table");
    let names: Vec<&str> = state.schema.iter().map(|c| c.header()).collect();
    let table_view = matdash::data::query::project(&state.visible, &names);
    table::data_table(ui, &table_view);
}
