//! Plot-ready views of a [`WhatIfAnalysis`], independent of any renderer.

use super::WhatIfAnalysis;

/// Which of the four strength series a line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthSeries {
    True,
    Original,
    Optimized,
    Corrected,
}

impl StrengthSeries {
    pub const ALL: [StrengthSeries; 4] = [
        StrengthSeries::True,
        StrengthSeries::Original,
        StrengthSeries::Optimized,
        StrengthSeries::Corrected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StrengthSeries::True => "True strength",
            StrengthSeries::Original => "Predicted (original water)",
            StrengthSeries::Optimized => "Predicted (optimized water)",
            StrengthSeries::Corrected => "Optimized + original error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrengthLine {
    pub series: StrengthSeries,
    /// Legend text, carrying the series' MATD.
    pub legend: String,
    /// `[sample index, strength]`.
    pub points: Vec<[f64; 2]>,
}

/// Plot A: every strength series per sample against the target line.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPlot {
    pub target_strength: f64,
    pub lines: Vec<StrengthLine>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterPoint {
    pub water_org: f64,
    pub water_new: f64,
    /// `pred_new - pred_org`, drives the colour.
    pub strength_change: f64,
}

/// Plot B: original vs optimized water, coloured by strength change.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterPlot {
    pub points: Vec<WaterPoint>,
    /// Endpoints of the `optimized == original` reference line.
    pub diagonal: [[f64; 2]; 2],
    /// Largest absolute strength change, for a symmetric colour scale.
    pub max_abs_change: f64,
}

fn legend(label: &str, matd: f64) -> String {
    if matd.is_nan() {
        format!("{label} (MATD n/a)")
    } else {
        format!("{label} (MATD {matd:.2} MPa)")
    }
}

fn indexed(values: &[f64]) -> Vec<[f64; 2]> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| [i as f64, *v])
        .collect()
}

impl TargetPlot {
    pub fn from_analysis(analysis: &WhatIfAnalysis) -> Self {
        let s = &analysis.series;
        let m = &analysis.summary;
        let corrected = s.corrected_optimized();
        let lines = StrengthSeries::ALL
            .iter()
            .map(|&series| {
                let (values, matd) = match series {
                    StrengthSeries::True => (&s.true_strength, m.true_strength),
                    StrengthSeries::Original => (&s.pred_org, m.original),
                    StrengthSeries::Optimized => (&s.pred_new, m.optimized),
                    StrengthSeries::Corrected => (&corrected, m.corrected),
                };
                StrengthLine {
                    series,
                    legend: legend(series.label(), matd),
                    points: indexed(values),
                }
            })
            .collect();
        Self {
            target_strength: analysis.target_strength,
            lines,
        }
    }
}

impl WaterPlot {
    pub fn from_analysis(analysis: &WhatIfAnalysis) -> Self {
        let s = &analysis.series;
        let points: Vec<WaterPoint> = s
            .water_org
            .iter()
            .zip(&s.water_new)
            .zip(s.strength_change())
            .map(|((&water_org, &water_new), strength_change)| WaterPoint {
                water_org,
                water_new,
                strength_change,
            })
            .collect();

        let (lo, hi) = points
            .iter()
            .flat_map(|p| [p.water_org, p.water_new])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), w| {
                (lo.min(w), hi.max(w))
            });
        let diagonal = if lo.is_finite() && hi.is_finite() {
            [[lo, lo], [hi, hi]]
        } else {
            [[0.0, 0.0], [1.0, 1.0]]
        };
        let max_abs_change = points
            .iter()
            .map(|p| p.strength_change.abs())
            .fold(0.0, f64::max);

        Self {
            points,
            diagonal,
            max_abs_change,
        }
    }
}
