// Regression models
// One trait covers the three candidates so the comparison loop stays
// agnostic to which concrete estimator it is driving.

pub mod boosting;
pub mod forest;
pub mod linear;
pub mod tree;

pub use boosting::GradientBoosting;
pub use forest::RandomForest;
pub use linear::LinearRegression;
pub use tree::{RegressionTree, TreeParams};

use anyhow::Result;
use nalgebra::{DMatrix, DVector};

use crate::config::RunConfig;
use crate::features::FeatureEncoder;
use crate::ingest::Transaction;

/// Trainable estimator capability: fit on a design matrix, predict rows.
pub trait Regressor {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()>;
    fn predict(&self, x: &DMatrix<f64>) -> DVector<f64>;
}

/// The candidate models, in the fixed order used for iteration and for
/// breaking RMSE ties (first encountered wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    LinearRegression,
    RandomForest,
    GradientBoosting,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::LinearRegression,
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
    ];

    /// Identifier used in the metrics document
    pub fn id(&self) -> &'static str {
        match self {
            ModelKind::LinearRegression => "linear_regression",
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
        }
    }

    /// Instantiate an unfitted estimator of this kind
    pub fn build(&self, config: &RunConfig) -> Box<dyn Regressor> {
        match self {
            ModelKind::LinearRegression => Box::new(LinearRegression::new()),
            ModelKind::RandomForest => Box::new(RandomForest::new(config.forest_seed)),
            ModelKind::GradientBoosting => Box::new(GradientBoosting::new()),
        }
    }
}

/// Fitted preprocessing-plus-estimator unit. Owned by the comparison stage
/// for the duration of one run and never persisted; the reporting stage only
/// asks it for predictions.
pub struct FittedPipeline {
    pub kind: ModelKind,
    pub encoder: FeatureEncoder,
    pub model: Box<dyn Regressor>,
}

impl FittedPipeline {
    /// Predict monetary values for the given record rows.
    pub fn predict_records(&self, records: &[Transaction], indices: &[usize]) -> DVector<f64> {
        let x = self.encoder.transform(records, indices);
        self.model.predict(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_ids_are_distinct() {
        let ids: Vec<&str> = ModelKind::ALL.iter().map(|k| k.id()).collect();
        assert_eq!(ids.len(), 3);
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_declaration_order_is_stable() {
        assert_eq!(ModelKind::ALL[0], ModelKind::LinearRegression);
        assert_eq!(ModelKind::ALL[1], ModelKind::RandomForest);
        assert_eq!(ModelKind::ALL[2], ModelKind::GradientBoosting);
    }
}
