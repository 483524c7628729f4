use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::WhatIfAnalysis;

/// One exported row; column names follow the backend's field names.
#[derive(Debug, Serialize)]
struct ExportRow {
    index: usize,
    true_strength: f64,
    water_org: f64,
    water_new: f64,
    pred_org: f64,
    pred_new: f64,
    pred_corrected: f64,
    strength_change: f64,
}

/// Write one CSV row per sample.
pub fn write_csv<W: Write>(analysis: &WhatIfAnalysis, out: W) -> Result<()> {
    let s = &analysis.series;
    let corrected = s.corrected_optimized();
    let change = s.strength_change();

    let mut writer = csv::Writer::from_writer(out);
    for index in 0..s.len() {
        writer
            .serialize(ExportRow {
                index,
                true_strength: s.true_strength[index],
                water_org: s.water_org[index],
                water_new: s.water_new[index],
                pred_org: s.pred_org[index],
                pred_new: s.pred_new[index],
                pred_corrected: corrected[index],
                strength_change: change[index],
            })
            .with_context(|| format!("writing row {index}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

pub fn export_csv(analysis: &WhatIfAnalysis, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(analysis, file)
}
