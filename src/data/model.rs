use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of mix-design features fed to the model.
pub const N_FEATURES: usize = 7;

/// Canonical feature names, in model column order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "cement",
    "slag",
    "fly_ash",
    "water",
    "plasticizer",
    "coarse_aggregate",
    "fine_aggregate",
];

/// One row of the model's design matrix.
pub type FeatureRow = [f64; N_FEATURES];

// ---------------------------------------------------------------------------
// Column – canonical names for the raw spreadsheet headers
// ---------------------------------------------------------------------------

/// Every column a dataset file must provide, after renaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Cement,
    Slag,
    FlyAsh,
    Water,
    Plasticizer,
    CoarseAggregate,
    FineAggregate,
    Age,
    Strength,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Cement,
        Column::Slag,
        Column::FlyAsh,
        Column::Water,
        Column::Plasticizer,
        Column::CoarseAggregate,
        Column::FineAggregate,
        Column::Age,
        Column::Strength,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Cement => "cement",
            Column::Slag => "slag",
            Column::FlyAsh => "fly_ash",
            Column::Water => "water",
            Column::Plasticizer => "plasticizer",
            Column::CoarseAggregate => "coarse_aggregate",
            Column::FineAggregate => "fine_aggregate",
            Column::Age => "age",
            Column::Strength => "strength",
        }
    }

    /// Map a raw header onto a canonical column.
    ///
    /// Accepts the canonical names themselves as well as the long headers of
    /// the UCI spreadsheet, e.g. `"Fly Ash (component 3)(kg in a m^3 mixture)"`
    /// or `"Concrete compressive strength(MPa, megapascals) "`.
    pub fn from_header(header: &str) -> Option<Column> {
        let h = header.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let col = if h.contains("strength") {
            Column::Strength
        } else if h.contains("cement") {
            Column::Cement
        } else if h.contains("slag") {
            Column::Slag
        } else if h.contains("fly ash") || h.contains("flyash") {
            Column::FlyAsh
        } else if h.contains("plasticizer") {
            Column::Plasticizer
        } else if h.contains("water") {
            Column::Water
        } else if h.contains("coarse") {
            Column::CoarseAggregate
        } else if h.contains("fine") {
            Column::FineAggregate
        } else if h == "age" || h.starts_with("age ") || h.starts_with("age(") {
            Column::Age
        } else {
            return None;
        };
        Some(col)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// MixFeatures – the seven mix-design quantities (kg per m³)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixFeatures {
    pub cement: f64,
    pub slag: f64,
    pub fly_ash: f64,
    pub water: f64,
    pub plasticizer: f64,
    pub coarse_aggregate: f64,
    pub fine_aggregate: f64,
}

impl MixFeatures {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_row(&self) -> FeatureRow {
        [
            self.cement,
            self.slag,
            self.fly_ash,
            self.water,
            self.plasticizer,
            self.coarse_aggregate,
            self.fine_aggregate,
        ]
    }

    pub fn from_row(row: FeatureRow) -> Self {
        let [cement, slag, fly_ash, water, plasticizer, coarse_aggregate, fine_aggregate] = row;
        Self {
            cement,
            slag,
            fly_ash,
            water,
            plasticizer,
            coarse_aggregate,
            fine_aggregate,
        }
    }

    /// Bit pattern of every feature, used to detect identical mixes.
    pub(crate) fn bit_key(&self) -> [u64; N_FEATURES] {
        self.to_row().map(f64::to_bits)
    }
}

// ---------------------------------------------------------------------------
// MixRecord – one raw row of the loaded file
// ---------------------------------------------------------------------------

/// A loaded row before curing-age filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixRecord {
    pub features: MixFeatures,
    /// Curing age in days.
    pub age_days: f64,
    /// Observed compressive strength (MPa).
    pub strength: f64,
}

// ---------------------------------------------------------------------------
// Sample / Dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub features: MixFeatures,
    /// Observed compressive strength (MPa).
    pub strength: f64,
}

/// Ordered samples sharing the mix-feature schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub samples: Vec<Sample>,
}

impl Dataset {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Feature matrix, one row per sample.
    pub fn feature_rows(&self) -> Vec<FeatureRow> {
        self.samples.iter().map(|s| s.features.to_row()).collect()
    }

    pub fn mixes(&self) -> Vec<MixFeatures> {
        self.samples.iter().map(|s| s.features).collect()
    }

    /// Observed strengths, aligned with [`Dataset::feature_rows`].
    pub fn targets(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.strength).collect()
    }

    /// Subset in the given index order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            samples: indices.iter().map(|&i| self.samples[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uci_headers_are_renamed() {
        let cases = [
            ("Cement (component 1)(kg in a m^3 mixture)", Column::Cement),
            ("Blast Furnace Slag (component 2)(kg in a m^3 mixture)", Column::Slag),
            ("Fly Ash (component 3)(kg in a m^3 mixture)", Column::FlyAsh),
            ("Water  (component 4)(kg in a m^3 mixture)", Column::Water),
            ("Superplasticizer (component 5)(kg in a m^3 mixture)", Column::Plasticizer),
            ("Coarse Aggregate  (component 6)(kg in a m^3 mixture)", Column::CoarseAggregate),
            ("Fine Aggregate (component 7)(kg in a m^3 mixture)", Column::FineAggregate),
            ("Age (day)", Column::Age),
            ("Concrete compressive strength(MPa, megapascals) ", Column::Strength),
        ];
        for (header, expected) in cases {
            assert_eq!(Column::from_header(header), Some(expected), "{header}");
        }
    }

    #[test]
    fn canonical_names_map_to_themselves() {
        for col in Column::ALL {
            assert_eq!(Column::from_header(col.name()), Some(col));
        }
        assert_eq!(Column::from_header("sample_id"), None);
        assert_eq!(Column::from_header("average"), None);
    }

    #[test]
    fn feature_row_order_matches_names() {
        let mix = MixFeatures::from_row([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(mix.water, 4.0);
        assert_eq!(mix.fine_aggregate, 7.0);
        assert_eq!(mix.to_row(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(FEATURE_NAMES[3], "water");
    }
}
