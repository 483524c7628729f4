use std::time::Duration;

use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct WhatIfApp {
    pub state: AppState,
}

impl eframe::App for WhatIfApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Pick up worker progress; keep repainting while it runs.
        self.state.poll_job();
        if self.state.is_running() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: model and analysis controls ----
        egui::SidePanel::left("control_panel")
            .default_width(300.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plots ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::central_view(ui, &mut self.state);
        });
    }
}
