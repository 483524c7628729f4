use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use super::model::{Dataset, MixRecord, Sample, N_FEATURES};

// ---------------------------------------------------------------------------
// Curing-age filter
// ---------------------------------------------------------------------------

/// Keep only rows cured for exactly `age_days`, dropping the age column.
pub fn at_curing_age(records: &[MixRecord], age_days: f64) -> Dataset {
    let samples = records
        .iter()
        .filter(|r| r.age_days == age_days)
        .map(|r| Sample {
            features: r.features,
            strength: r.strength,
        })
        .collect();
    Dataset::new(samples)
}

// ---------------------------------------------------------------------------
// Duplicate averaging
// ---------------------------------------------------------------------------

/// Merge samples with identical mix features, averaging their strengths.
///
/// The merged sample sits where the group first appeared.
pub fn average_duplicates(dataset: &Dataset) -> Dataset {
    let mut slot_of: BTreeMap<[u64; N_FEATURES], usize> = BTreeMap::new();
    let mut groups: Vec<(Sample, f64, usize)> = Vec::new();

    for sample in &dataset.samples {
        let key = sample.features.bit_key();
        match slot_of.get(&key).copied() {
            Some(slot) => {
                let (_, sum, count) = &mut groups[slot];
                *sum += sample.strength;
                *count += 1;
            }
            None => {
                slot_of.insert(key, groups.len());
                groups.push((*sample, sample.strength, 1));
            }
        }
    }

    let samples = groups
        .into_iter()
        .map(|(first, sum, count)| Sample {
            features: first.features,
            strength: sum / count as f64,
        })
        .collect();
    Dataset::new(samples)
}

// ---------------------------------------------------------------------------
// Train / test split
// ---------------------------------------------------------------------------

#[derive(Error, Debug, PartialEq)]
pub enum SplitError {
    #[error("test fraction must lie strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),
    #[error("cannot split {rows} rows with test fraction {fraction}: a partition would be empty")]
    TooFewRows { rows: usize, fraction: f64 },
}

/// Disjoint train and test partitions of one dataset.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Shuffle rows with a seeded RNG and cut off `ceil(n * test_fraction)` for testing.
pub fn train_test_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    let n = dataset.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(SplitError::TooFewRows {
            rows: n,
            fraction: test_fraction,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok(TrainTestSplit {
        train: dataset.select(train_idx),
        test: dataset.select(test_idx),
    })
}
