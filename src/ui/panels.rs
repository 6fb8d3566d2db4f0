use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use matdash::data::format::TableFormat;
use matdash::data::{Column, Value};

use crate::state::{AppState, Page, Status, CUSTOM_POINT_COLUMNS};

// ---------------------------------------------------------------------------
// Left side panel – navigation and explore controls
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Navigation");
    ui.separator();
    if ui
        .selectable_label(state.page == Page::Explore, "Explore the Database")
        .clicked()
    {
        state.page = Page::Explore;
    }
    if ui
        .selectable_label(state.page == Page::Upload, "Upload Data")
        .clicked()
    {
        state.page = Page::Upload;
    }
    ui.add_space(8.0);

    if state.page != Page::Explore || state.total_rows == 0 {
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            explore_controls(ui, state);
            ui.separator();
            particle_filter(ui, state);
            ui.separator();
            custom_point_inputs(ui, state);
        });
}

fn explore_controls(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Explore the Database:");
    let options = state.axis_options.clone();

    column_combo(ui, "x_axis", "Select X-axis:", &mut state.plot.x_axis, &options, false);
    column_combo(ui, "y_axis", "Select Y-axis:", &mut state.plot.y_axis, &options, false);

    let size_changed = column_combo(
        ui,
        "size_by",
        "Select Data for Size:",
        &mut state.plot.size_by,
        &options,
        true,
    );
    let color_changed = column_combo(
        ui,
        "color_by",
        "Select Data for Color:",
        &mut state.plot.color_by,
        &options,
        true,
    );
    if size_changed || color_changed {
        state.rebuild_scales();
    }
}

/// Combo box over `options`; returns whether the selection changed.
fn column_combo(
    ui: &mut Ui,
    id: &str,
    label: &str,
    current: &mut Option<Column>,
    options: &[Column],
    allow_none: bool,
) -> bool {
    let mut changed = false;
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.map(Column::header).unwrap_or("None"))
        .show_ui(ui, |ui: &mut Ui| {
            if allow_none {
                changed |= ui.selectable_value(current, None, "None").changed();
            }
            for col in options {
                changed |= ui
                    .selectable_value(current, Some(*col), col.header())
                    .changed();
            }
        });
    changed
}

fn particle_filter(ui: &mut Ui, state: &mut AppState) {
    let n_selected = state.particle_filter.len();
    let n_total = state.particle_options.len();
    let header_text = if n_selected == 0 {
        format!("Filter by Particle Used  (all {n_total})")
    } else {
        format!("Filter by Particle Used  ({n_selected}/{n_total})")
    };

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("particle_filter")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Clear").clicked() {
                state.clear_particle_filter();
            }

            let options = state.particle_options.clone();
            let colour_particles = state.plot.color_by.is_none();
            for particle in &options {
                let mut checked = state.particle_filter.contains(particle);
                let mut text = RichText::new(particle);
                if colour_particles {
                    let value = Value::Text(particle.clone());
                    text = text.color(state.particle_colors.color_for(Some(&value)));
                }
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_particle(particle);
                }
            }
        });
}

fn custom_point_inputs(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Evaluate your new particle:");
    for col in CUSTOM_POINT_COLUMNS {
        ui.label(format!("Enter {}", col.label()));
        let text = state.custom_point.entry(col).or_default();
        ui.add(egui::TextEdit::singleline(text).hint_text("0.00000"));
    }
    if state.custom_marker().is_none() {
        ui.label(
            RichText::new("Enter values for both plotted axes to show your particle.")
                .small()
                .weak(),
        );
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Export…").clicked() {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(state.dataset_path().display().to_string());
        ui.separator();
        ui.label(format!(
            "{} rows loaded, {} visible",
            state.total_rows,
            state.visible.len()
        ));

        match &state.status {
            Some(Status::Error(msg)) => {
                ui.separator();
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            Some(Status::Info(msg)) => {
                ui.separator();
                ui.label(RichText::new(msg).color(Color32::DARK_GREEN));
            }
            None => {}
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn with_format_filters(mut dialog: rfd::FileDialog) -> rfd::FileDialog {
    let all: Vec<&str> = TableFormat::ALL
        .iter()
        .flat_map(|f| f.extensions().iter().copied())
        .collect();
    dialog = dialog.add_filter("Supported files", &all[..]);
    for format in TableFormat::ALL {
        dialog = dialog.add_filter(format.name(), format.extensions());
    }
    dialog
}

pub fn open_file_dialog(state: &mut AppState) {
    let dialog = with_format_filters(rfd::FileDialog::new().set_title("Open dataset"));
    if let Some(path) = dialog.pick_file() {
        state.open_dataset(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let dialog = with_format_filters(
        rfd::FileDialog::new()
            .set_title("Export dataset")
            .set_file_name("export.csv"),
    );
    if let Some(path) = dialog.save_file() {
        state.export(&path);
    }
}
