// Sequential gradient-boosted regression trees with squared loss: shallow
// trees fit the running residual, each scaled by the learning rate. Fully
// deterministic, no resampling.

use anyhow::Result;
use nalgebra::{DMatrix, DVector};

use super::tree::{RegressionTree, TreeParams};
use super::Regressor;

#[derive(Debug, Clone, Copy)]
pub struct BoostingParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

impl Default for BoostingParams {
    fn default() -> Self {
        BoostingParams {
            n_rounds: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                max_depth: 3,
                min_samples_split: 2,
                min_samples_leaf: 1,
            },
        }
    }
}

#[derive(Debug)]
pub struct GradientBoosting {
    params: BoostingParams,
    base: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new() -> Self {
        Self::with_params(BoostingParams::default())
    }

    pub fn with_params(params: BoostingParams) -> Self {
        GradientBoosting {
            params,
            base: 0.0,
            trees: Vec::new(),
        }
    }
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()> {
        let n = x.nrows();
        let all_rows: Vec<usize> = (0..n).collect();

        self.base = y.iter().sum::<f64>() / n as f64;
        self.trees.clear();

        let mut residual = y.add_scalar(-self.base);
        for _ in 0..self.params.n_rounds {
            let mut tree = RegressionTree::new(self.params.tree);
            tree.fit(x, &residual, &all_rows);
            let correction = tree.predict(x);
            residual -= correction * self.params.learning_rate;
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> DVector<f64> {
        let mut pred = DVector::from_element(x.nrows(), self.base);
        for tree in &self.trees {
            pred += tree.predict(x) * self.params.learning_rate;
        }
        pred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_constant_target() {
        let x = DMatrix::from_row_slice(5, 1, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = DVector::from_element(5, 3.0);

        let mut model = GradientBoosting::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        for i in 0..5 {
            assert_abs_diff_eq!(pred[i], 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fits_step_function_closely() {
        let x = DMatrix::from_row_slice(6, 1, &[1.0, 2.0, 3.0, 10.0, 11.0, 12.0]);
        let y = DVector::from_vec(vec![0.0, 0.0, 0.0, 100.0, 100.0, 100.0]);

        let mut model = GradientBoosting::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        for i in 0..3 {
            assert!(pred[i].abs() < 1.0, "low side predicted {}", pred[i]);
        }
        for i in 3..6 {
            assert!((pred[i] - 100.0).abs() < 1.0, "high side predicted {}", pred[i]);
        }
    }

    #[test]
    fn test_is_deterministic() {
        let x = DMatrix::from_row_slice(6, 1, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let y = DVector::from_vec(vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);

        let mut a = GradientBoosting::new();
        let mut b = GradientBoosting::new();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x), b.predict(&x));
    }
}
