use eframe::egui::{self, Color32, RichText, Ui};

use matdash::data::{Column, Dataset};

use crate::state::{AppState, Status};
use crate::ui::table;

// ---------------------------------------------------------------------------
// Upload page – manual data entry
// ---------------------------------------------------------------------------

pub fn upload_page(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Upload Data");
    ui.label("This page allows users to upload new data.");
    ui.add_space(8.0);

    let schema = state.schema.clone();
    egui::Grid::new("data_entry_form")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui: &mut Ui| {
            for col in schema {
                ui.label(col.label());
                let hint = match col {
                    Column::PaperDoi => "e.g. 10.1016/j.jmps.2024.105732",
                    c if c.is_numeric() => "0.00000",
                    _ => "",
                };
                let text = state.form.entry(col).or_default();
                ui.add(egui::TextEdit::singleline(text).hint_text(hint));
                ui.end_row();
            }
        });

    ui.add_space(8.0);
    if ui.button("Submit Data").clicked() {
        state.submit_form();
    }

    match &state.status {
        Some(Status::Error(msg)) => {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
        Some(Status::Info(msg)) => {
            ui.label(RichText::new(msg).color(Color32::DARK_GREEN));
        }
        None => {}
    }

    if let Some(record) = &state.last_submitted {
        ui.add_space(8.0);
        ui.strong("Last submitted row");
        let mut row = Dataset::with_columns(record.set_columns());
        if row.push(record.clone()).is_ok() {
            table::data_table(ui, &row);
        }
    }
}
