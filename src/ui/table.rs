use eframe::egui::Ui;
use egui_extras::{Column as TableColumn, TableBuilder};

use matdash::data::Dataset;

/// Scrollable table of every row and schema column of `dataset`.
pub fn data_table(ui: &mut Ui, dataset: &Dataset) {
    let columns = dataset.columns();
    if columns.is_empty() {
        ui.label("No columns to show.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .columns(TableColumn::auto().at_least(80.0), columns.len())
        .header(20.0, |mut header| {
            for col in columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(col.header());
                });
            }
        })
        .body(|body| {
            body.rows(18.0, dataset.len(), |mut row| {
                let record = &dataset.records()[row.index()];
                for col in columns {
                    row.col(|ui: &mut Ui| {
                        let text = record.get(*col).map(|v| v.to_string()).unwrap_or_default();
                        ui.label(text);
                    });
                }
            });
        });
}
