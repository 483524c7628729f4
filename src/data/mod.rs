/// Data layer: core types, loading, and preparation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file, rename columns → Vec<MixRecord>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  curing age → dedupe → seeded train/test split
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ TrainTestSplit│  two disjoint Datasets
///   └──────────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;

use anyhow::{bail, Result};

use crate::config::WhatIfConfig;
use filter::{at_curing_age, average_duplicates, train_test_split, TrainTestSplit};
use model::{Dataset, MixRecord};

/// Everything derived from one loaded file.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Rows as read from disk.
    pub raw_rows: usize,
    /// Rows left after the curing-age filter, before dedupe.
    pub rows_at_age: usize,
    /// Filtered and deduplicated samples, in file order.
    pub dataset: Dataset,
    pub split: TrainTestSplit,
}

/// Run the preparation steps configured in `config` over loaded records.
pub fn prepare(records: &[MixRecord], config: &WhatIfConfig) -> Result<PreparedData> {
    let at_age = at_curing_age(records, config.curing_age_days);
    let rows_at_age = at_age.len();
    let dataset = average_duplicates(&at_age);
    log::info!(
        "{} rows loaded, {} at {} days, {} unique mixes",
        records.len(),
        rows_at_age,
        config.curing_age_days,
        dataset.len()
    );
    if dataset.is_empty() {
        bail!("No mixes cured for {} days in the loaded data", config.curing_age_days);
    }
    let split = train_test_split(&dataset, config.test_fraction, config.seed)?;
    Ok(PreparedData {
        raw_rows: records.len(),
        rows_at_age,
        dataset,
        split,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::MixFeatures;

    fn record(cement: f64, age_days: f64) -> MixRecord {
        MixRecord {
            features: MixFeatures::from_row([cement, 0.0, 0.0, 180.0, 0.0, 1000.0, 700.0]),
            age_days,
            strength: cement / 10.0,
        }
    }

    #[test]
    fn prepare_counts_each_stage() {
        let mut records: Vec<MixRecord> = (0..10).map(|i| record(200.0 + i as f64, 28.0)).collect();
        records.push(record(200.0, 28.0));
        records.push(record(300.0, 7.0));

        let prepared = prepare(&records, &WhatIfConfig::default()).unwrap();
        assert_eq!(prepared.raw_rows, 12);
        assert_eq!(prepared.rows_at_age, 11);
        assert_eq!(prepared.dataset.len(), 10);
        assert_eq!(prepared.split.test.len(), 2);
        assert_eq!(prepared.split.train.len(), 8);
    }

    #[test]
    fn no_rows_at_curing_age_is_an_error() {
        let records: Vec<MixRecord> = (0..5).map(|i| record(200.0 + i as f64, 7.0)).collect();
        let err = prepare(&records, &WhatIfConfig::default()).unwrap_err();
        assert!(err.to_string().contains("28 days"), "{err}");
    }
}
