// Ordinary least squares with intercept, solved through SVD so collinear
// one-hot blocks do not break the fit.

use anyhow::{anyhow, Result};
use nalgebra::{DMatrix, DVector, SVD};

use super::Regressor;

const SVD_EPSILON: f64 = 1e-10;

#[derive(Debug, Default)]
pub struct LinearRegression {
    /// Intercept followed by one coefficient per feature column
    coefficients: Option<DVector<f64>>,
}

impl LinearRegression {
    pub fn new() -> Self {
        LinearRegression { coefficients: None }
    }

    pub fn coefficients(&self) -> Option<&DVector<f64>> {
        self.coefficients.as_ref()
    }

    fn design(x: &DMatrix<f64>) -> DMatrix<f64> {
        x.clone().insert_column(0, 1.0)
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()> {
        let design = Self::design(x);
        let svd = SVD::new(design, true, true);
        let coefficients = svd
            .solve(y, SVD_EPSILON)
            .map_err(|e| anyhow!("least-squares solve failed: {}", e))?;
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> DVector<f64> {
        match &self.coefficients {
            Some(coefficients) => Self::design(x) * coefficients,
            None => DVector::zeros(x.nrows()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_recovers_exact_coefficients() {
        // y = 1 + 2 * x on noiseless data
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coefficients = model.coefficients().unwrap();
        assert_abs_diff_eq!(coefficients[0], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(coefficients[1], 2.0, epsilon = 1e-8);

        let pred = model.predict(&x);
        for i in 0..4 {
            assert_abs_diff_eq!(pred[i], y[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_two_features() {
        // y = 10 + 3*a - 2*b
        let x = DMatrix::from_row_slice(
            5,
            2,
            &[1.0, 1.0, 2.0, 0.0, 3.0, 2.0, 4.0, 1.0, 5.0, 3.0],
        );
        let y = DVector::from_iterator(
            5,
            x.row_iter().map(|r| 10.0 + 3.0 * r[0] - 2.0 * r[1]),
        );

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        for i in 0..5 {
            assert_abs_diff_eq!(pred[i], y[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_collinear_columns_still_solve() {
        // Second column duplicates the first; SVD handles the rank deficit
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
        let y = DVector::from_vec(vec![2.0, 4.0, 6.0, 8.0]);

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        for i in 0..4 {
            assert_abs_diff_eq!(pred[i], y[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_unfitted_predicts_zeros() {
        let model = LinearRegression::new();
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let pred = model.predict(&x);
        assert_eq!(pred[0], 0.0);
        assert_eq!(pred[1], 0.0);
    }
}
