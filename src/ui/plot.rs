use eframe::egui::{Color32, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{HLine, Legend, Line, LineStyle, Plot, PlotPoints, Points};

use crate::color::{generate_palette, DivergingScale};
use crate::state::{AppState, PlotView};
use crate::whatif::plots::{TargetPlot, WaterPlot};
use crate::whatif::WhatIfAnalysis;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the view selector and the selected plot.
pub fn central_view(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        for view in PlotView::ALL {
            ui.selectable_value(&mut state.view, view, view.label());
        }
    });
    ui.separator();

    let analysis = match &state.analysis {
        Some(a) => a,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                let hint = if state.is_running() {
                    "Analysis running…"
                } else {
                    "Load a dataset and run the what-if analysis to see results"
                };
                ui.heading(hint);
            });
            return;
        }
    };

    match state.view {
        PlotView::Target => target_plot(ui, analysis),
        PlotView::Water => water_plot(ui, analysis),
        PlotView::Table => results_table(ui, analysis),
    }
}

// ---------------------------------------------------------------------------
// Plot A: strength series vs target
// ---------------------------------------------------------------------------

fn target_plot(ui: &mut Ui, analysis: &WhatIfAnalysis) {
    let data = TargetPlot::from_analysis(analysis);
    let palette = generate_palette(data.lines.len());

    Plot::new("target_plot")
        .legend(Legend::default())
        .x_axis_label("Sample")
        .y_axis_label("Compressive strength (MPa)")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (line, color) in data.lines.iter().zip(palette) {
                let points: PlotPoints = line.points.iter().copied().collect();
                plot_ui.points(
                    Points::new(points)
                        .name(&line.legend)
                        .color(color)
                        .radius(2.5),
                );
                let path: PlotPoints = line.points.iter().copied().collect();
                plot_ui.line(
                    Line::new(path)
                        .name(&line.legend)
                        .color(color.gamma_multiply(0.5))
                        .width(1.0),
                );
            }
            plot_ui.hline(
                HLine::new(data.target_strength)
                    .name(format!("Target {:.1} MPa", data.target_strength))
                    .color(Color32::WHITE)
                    .style(LineStyle::dashed_loose())
                    .width(1.5),
            );
        });
}

// ---------------------------------------------------------------------------
// Plot B: original vs optimized water
// ---------------------------------------------------------------------------

fn water_plot(ui: &mut Ui, analysis: &WhatIfAnalysis) {
    let data = WaterPlot::from_analysis(analysis);
    let scale = DivergingScale::new(data.max_abs_change);

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Predicted strength change (MPa):");
        for (label, color) in scale.legend_entries(5) {
            ui.colored_label(color, label);
        }
    });

    Plot::new("water_plot")
        .x_axis_label("Original water (kg/m³)")
        .y_axis_label("Optimized water (kg/m³)")
        .data_aspect(1.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let diagonal: PlotPoints = data.diagonal.to_vec().into();
            plot_ui.line(
                Line::new(diagonal)
                    .color(Color32::GRAY)
                    .style(LineStyle::dashed_dense())
                    .width(1.0),
            );
            for p in &data.points {
                plot_ui.points(
                    Points::new(vec![[p.water_org, p.water_new]])
                        .color(scale.color_for(p.strength_change))
                        .radius(3.5),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Per-sample table
// ---------------------------------------------------------------------------

fn results_table(ui: &mut Ui, analysis: &WhatIfAnalysis) {
    let s = &analysis.series;
    let corrected = s.corrected_optimized();
    let headers = [
        "#",
        "true",
        "water org",
        "water new",
        "pred org",
        "pred new",
        "corrected",
    ];

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .columns(Column::remainder(), headers.len() - 1)
        .header(20.0, |mut header| {
            for h in headers {
                header.col(|ui| {
                    ui.strong(h);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, s.len(), |mut row| {
                let i = row.index();
                let cells = [
                    s.true_strength[i],
                    s.water_org[i],
                    s.water_new[i],
                    s.pred_org[i],
                    s.pred_new[i],
                    corrected[i],
                ];
                row.col(|ui| {
                    ui.label(i.to_string());
                });
                for v in cells {
                    row.col(|ui| {
                        ui.label(format!("{v:.2}"));
                    });
                }
            });
        });
}
