mod app;
mod color;
mod config;
mod state;
mod ui;

use anyhow::Context;
use app::DashboardApp;
use config::DashboardConfig;
use eframe::egui;
use matdash::data::DatasetStore;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DashboardConfig::from_env();
    log::info!("Using dataset {}", config.dataset_path.display());
    let store = DatasetStore::open(&config.dataset_path)
        .with_context(|| format!("opening dataset {}", config.dataset_path.display()))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Soft Materials Transport Database",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(AppState::new(store))))),
    )
    .map_err(|e| anyhow::anyhow!("running dashboard: {e}"))
}
