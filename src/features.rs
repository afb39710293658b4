// Feature contract
// Numeric features (surface, rooms) pass through unchanged; categorical
// features (property category, department) are one-hot encoded. The encoder
// vocabulary comes from training rows only, so no test row leaks into
// fitting; a category unseen at fit time maps to an all-zero block.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;

use crate::ingest::Transaction;

/// Deterministic 80/20 index partition.
///
/// Shuffles `0..n_rows` with a seeded generator and holds out the trailing
/// `test_fraction` share (at least one row). The same seed and the same input
/// ordering reproduce the same partition, which lets the reporting stage
/// re-derive the split used during comparison.
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut n_test = (n_rows as f64 * test_fraction).round() as usize;
    n_test = n_test.clamp(1, n_rows.saturating_sub(1).max(1));

    let split = n_rows - n_test;
    let test = indices.split_off(split);
    (indices, test)
}

/// Extract the modeling target (monetary value, never price per m²).
pub fn target_vector(records: &[Transaction], indices: &[usize]) -> DVector<f64> {
    DVector::from_iterator(indices.len(), indices.iter().map(|&i| records[i].value))
}

/// One-hot encoder over the two categorical features, fit on training rows.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    categories: Vec<String>,
    departments: Vec<String>,
}

impl FeatureEncoder {
    /// Build the vocabulary from the training rows only (sorted for
    /// determinism).
    pub fn fit(records: &[Transaction], train_indices: &[usize]) -> Self {
        let mut categories = BTreeSet::new();
        let mut departments = BTreeSet::new();
        for &i in train_indices {
            categories.insert(records[i].category.label().to_string());
            departments.insert(records[i].department.clone());
        }
        FeatureEncoder {
            categories: categories.into_iter().collect(),
            departments: departments.into_iter().collect(),
        }
    }

    /// Number of output columns: surface, rooms, then the one-hot blocks.
    pub fn width(&self) -> usize {
        2 + self.categories.len() + self.departments.len()
    }

    /// Assemble the design matrix for the given rows. Unknown categorical
    /// values leave their block at zero instead of erroring.
    pub fn transform(&self, records: &[Transaction], indices: &[usize]) -> DMatrix<f64> {
        let width = self.width();
        let mut matrix = DMatrix::zeros(indices.len(), width);
        for (row, &i) in indices.iter().enumerate() {
            let record = &records[i];
            matrix[(row, 0)] = record.surface;
            matrix[(row, 1)] = record.rooms as f64;
            if let Ok(pos) = self
                .categories
                .binary_search_by(|c| c.as_str().cmp(record.category.label()))
            {
                matrix[(row, 2 + pos)] = 1.0;
            }
            if let Ok(pos) = self
                .departments
                .binary_search_by(|d| d.as_str().cmp(record.department.as_str()))
            {
                matrix[(row, 2 + self.categories.len() + pos)] = 1.0;
            }
        }
        matrix
    }
}
