use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::regression::ModelKind;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – model and analysis controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            dataset_section(ui, state);
            ui.separator();
            model_section(ui, state);
            ui.separator();
            analysis_section(ui, state);
        });
}

fn dataset_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Dataset");
    let Some(prepared) = &state.prepared else {
        ui.label("No dataset loaded.");
        return;
    };
    if let Some(path) = &state.source_path {
        ui.label(RichText::new(path.display().to_string()).small());
    }
    egui::Grid::new("dataset_summary")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("Rows in file");
            ui.label(prepared.raw_rows.to_string());
            ui.end_row();
            ui.label(format!("Rows at {} days", state.config.curing_age_days));
            ui.label(prepared.rows_at_age.to_string());
            ui.end_row();
            ui.label("Unique mixes");
            ui.label(prepared.dataset.len().to_string());
            ui.end_row();
            ui.label("Train / test");
            ui.label(format!(
                "{} / {}",
                prepared.split.train.len(),
                prepared.split.test.len()
            ));
            ui.end_row();
        });

    let mut fraction = state.config.test_fraction;
    let changed = ui
        .horizontal(|ui: &mut Ui| {
            ui.label("Test fraction");
            ui.add(egui::DragValue::new(&mut fraction).speed(0.01).range(0.05..=0.5))
                .changed()
        })
        .inner;
    if changed {
        state.config.test_fraction = fraction;
        if let Err(e) = state.reprepare() {
            state.fail("Failed to re-split dataset", &e);
        }
    }
}

fn model_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Model");

    egui::ComboBox::from_id_salt("model_kind")
        .selected_text(state.model_kind.label())
        .show_ui(ui, |ui: &mut Ui| {
            for kind in ModelKind::ALL {
                ui.selectable_value(&mut state.model_kind, kind, kind.label());
            }
        });

    if state.model_kind == ModelKind::Linear {
        ui.horizontal(|ui: &mut Ui| {
            ui.label("Ridge alpha");
            ui.add(
                egui::DragValue::new(&mut state.config.ridge_alpha)
                    .speed(0.1)
                    .range(0.0..=1000.0),
            );
        });
    }

    let can_fit = state.prepared.is_some();
    if ui.add_enabled(can_fit, egui::Button::new("Fit model")).clicked() {
        if let Err(e) = state.fit_model() {
            state.fail("Failed to fit model", &e);
        }
    }

    if let Some(report) = &state.report {
        ui.add_space(4.0);
        egui::Grid::new("evaluation_report")
            .num_columns(3)
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                ui.label("");
                ui.strong("train");
                ui.strong("test");
                ui.end_row();
                ui.label("R²");
                ui.label(format!("{:.3}", report.r2_train));
                ui.label(format!("{:.3}", report.r2_test));
                ui.end_row();
                ui.label("MAE (MPa)");
                ui.label(format!("{:.3}", report.mae_train));
                ui.label(format!("{:.3}", report.mae_test));
                ui.end_row();
            });
    } else if state.model.is_some() {
        ui.label("Model loaded; load a dataset to evaluate it.");
    }
}

fn analysis_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("What-if analysis");

    ui.label("Backend URL");
    ui.text_edit_singleline(&mut state.config.backend_url);
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Target strength");
        ui.add(
            egui::DragValue::new(&mut state.config.target_strength)
                .speed(0.5)
                .range(1.0..=150.0)
                .suffix(" MPa"),
        );
    });

    let can_run = state.prepared.is_some() && !state.is_running();
    if ui.add_enabled(can_run, egui::Button::new("Run analysis")).clicked() {
        if let Err(e) = state.start_analysis() {
            state.fail("Failed to start analysis", &e);
        }
    }

    if let Some(job) = &state.job {
        let (fraction, text) = match job.progress {
            Some(p) if p.total > 0 => (
                p.row as f32 / p.total as f32,
                format!("row {} of {}", p.row, p.total),
            ),
            _ => (0.0, "starting…".to_string()),
        };
        ui.add(egui::ProgressBar::new(fraction).text(text));
    }

    if let Some(analysis) = &state.analysis {
        let m = &analysis.summary;
        ui.add_space(4.0);
        ui.strong(format!(
            "MATD vs {:.1} MPa over {} mixes",
            analysis.target_strength,
            analysis.series.len()
        ));
        egui::Grid::new("matd_summary")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                for (label, value) in [
                    ("True strength", m.true_strength),
                    ("Original prediction", m.original),
                    ("Optimized prediction", m.optimized),
                    ("Optimized + error", m.corrected),
                ] {
                    ui.label(label);
                    ui.label(format_matd(value));
                    ui.end_row();
                }
            });
    }
}

fn format_matd(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.2} MPa")
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
                open_dataset_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Load model…").clicked() {
                load_model_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.model.is_some(), egui::Button::new("Save model…"))
                .clicked()
            {
                save_model_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(state.analysis.is_some(), egui::Button::new("Export results…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(prepared) = &state.prepared {
            ui.label(format!(
                "{} mixes at {} days",
                prepared.dataset.len(),
                state.config.curing_age_days
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open concrete mix data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_dataset(&path);
    }
}

pub fn load_model_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Load fitted model")
        .add_filter("Model", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.load_model(&path);
    }
}

pub fn save_model_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save fitted model")
        .add_filter("Model", &["json"])
        .set_file_name("strength_model.json")
        .save_file();

    if let Some(path) = file {
        state.save_model(&path);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export what-if results")
        .add_filter("CSV", &["csv"])
        .set_file_name("whatif_results.csv")
        .save_file();

    if let Some(path) = file {
        state.export_results(&path);
    }
}
