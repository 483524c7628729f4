mod app;
mod backend;
mod color;
mod config;
mod data;
mod evaluate;
mod metrics;
mod regression;
mod state;
mod ui;
mod whatif;

use app::WhatIfApp;
use config::WhatIfConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let mut state = match WhatIfConfig::discover() {
        Ok(config) => AppState::new(config),
        Err(e) => {
            log::error!("Ignoring config: {e}");
            let mut state = AppState::default();
            state.status_message = Some(format!("Ignoring config: {e}"));
            state
        }
    };
    state.load_configured_files();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Concrete What-If – Strength Model Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(WhatIfApp { state }))),
    )
}
