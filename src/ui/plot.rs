use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, MarkerShape, Plot, Points};

use matdash::data::Column;

use crate::color::normalized;
use crate::state::AppState;

const MIN_RADIUS: f32 = 3.0;
const MAX_RADIUS: f32 = 12.0;

// ---------------------------------------------------------------------------
// Scatter plot (explore page)
// ---------------------------------------------------------------------------

/// Render the scatter plot of the filtered rows plus the "User Input" marker.
pub fn scatter_plot(ui: &mut Ui, state: &AppState, height: f32) {
    let (Some(x_axis), Some(y_axis)) = (state.plot.x_axis, state.plot.y_axis) else {
        ui.label("Please select both X-axis and Y-axis to view the chart.");
        return;
    };

    if let Some(title) = state.plot_title() {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.heading(title);
        });
    }

    let view = state.plot_view();

    Plot::new("scatter_plot")
        .height(height)
        .legend(Legend::default())
        .x_axis_label(x_axis.label())
        .y_axis_label(y_axis.label())
        .label_formatter(|name, value| {
            if name.is_empty() {
                format!("x = {:.5}\ny = {:.5}", value.x, value.y)
            } else {
                format!("{name}\nx = {:.5}\ny = {:.5}", value.x, value.y)
            }
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for record in view.records() {
                let (Some(x), Some(y)) = (record.number(x_axis), record.number(y_axis)) else {
                    continue;
                };

                // Hover / legend name is the particle.
                let name = record
                    .particle_used
                    .clone()
                    .unwrap_or_else(|| "(unnamed)".to_string());

                let color = match (state.plot.color_by, &state.color_scale) {
                    (Some(col), Some(scale)) => scale.color_for(record.number(col)),
                    _ => state
                        .particle_colors
                        .color_for(record.get(Column::ParticleUsed).as_ref()),
                };

                let radius = match (state.plot.size_by, state.size_range) {
                    (Some(col), Some((min, max))) => record
                        .number(col)
                        .map(|v| {
                            MIN_RADIUS + (MAX_RADIUS - MIN_RADIUS) * normalized(v, min, max) as f32
                        })
                        .unwrap_or(MIN_RADIUS),
                    _ => 4.0,
                };

                plot_ui.points(
                    Points::new(vec![[x, y]])
                        .name(&name)
                        .color(color)
                        .radius(radius)
                        .filled(true),
                );
            }

            if let Some(marker) = state.custom_marker() {
                plot_ui.points(
                    Points::new(vec![marker])
                        .name("User Input")
                        .color(Color32::RED)
                        .shape(MarkerShape::Asterisk)
                        .radius(9.0),
                );
            }
        });
}
