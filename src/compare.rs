// Model comparison
// Every candidate is evaluated on the identical seeded 80/20 partition with
// a train-only feature contract, then ranked by held-out RMSE.

use anyhow::{ensure, Result};
use log::info;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::features::{target_vector, train_test_split, FeatureEncoder};
use crate::ingest::Transaction;
use crate::models::{FittedPipeline, ModelKind};

/// Reserved key carrying the winning model identifier in the metrics
/// document; the underscore prefix keeps it distinct from any model name.
pub const BEST_MODEL_KEY: &str = "_best_model";

/// Held-out performance of one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "R2")]
    pub r2: f64,
    #[serde(rename = "MAPE")]
    pub mape: f64,
}

/// Outcome of one comparison run: per-model metrics in declaration order,
/// the winning identifier and the winning fitted pipeline.
pub struct Comparison {
    pub scores: Vec<(String, ModelMetrics)>,
    pub best_model: String,
    pub best_pipeline: FittedPipeline,
}

impl std::fmt::Debug for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparison")
            .field("scores", &self.scores)
            .field("best_model", &self.best_model)
            .field("best_pipeline_kind", &self.best_pipeline.kind)
            .finish()
    }
}

/// Fit and score every candidate, select the strictly smallest RMSE.
///
/// Each candidate re-derives the same seeded partition, so the comparison is
/// apples-to-apples; ties keep the earliest candidate in declaration order.
pub fn compare_models(records: &[Transaction], config: &RunConfig) -> Result<Comparison> {
    ensure!(
        records.len() >= 2,
        "cannot compare models on {} cleaned record(s); need at least 2",
        records.len()
    );

    let mut scores = Vec::with_capacity(ModelKind::ALL.len());
    let mut best: Option<(f64, FittedPipeline)> = None;

    for kind in ModelKind::ALL {
        let (train, test) = train_test_split(records.len(), config.test_fraction, config.split_seed);

        // The encoder vocabulary is fit on training rows only, so no test
        // category leaks into the pipeline.
        let encoder = FeatureEncoder::fit(records, &train);
        let x_train = encoder.transform(records, &train);
        let y_train = target_vector(records, &train);
        let x_test = encoder.transform(records, &test);
        let y_test = target_vector(records, &test);

        let mut model = kind.build(config);
        model.fit(&x_train, &y_train)?;
        let predicted = model.predict(&x_test);

        let metrics = compute_metrics(&y_test, &predicted);
        info!(
            "{}: RMSE={:.2} R2={:.4} MAPE={:.4}",
            kind.id(),
            metrics.rmse,
            metrics.r2,
            metrics.mape
        );

        let is_better = match &best {
            None => true,
            Some((best_rmse, _)) => metrics.rmse < *best_rmse,
        };
        if is_better {
            best = Some((
                metrics.rmse,
                FittedPipeline {
                    kind,
                    encoder,
                    model,
                },
            ));
        }
        scores.push((kind.id().to_string(), metrics));
    }

    // ModelKind::ALL is never empty, so a winner always exists.
    let (_, best_pipeline) = best.take().ok_or_else(|| {
        anyhow::anyhow!("no candidate model produced a score")
    })?;

    Ok(Comparison {
        scores,
        best_model: best_pipeline.kind.id().to_string(),
        best_pipeline,
    })
}

/// RMSE, R² and MAPE of predictions against observations.
pub fn compute_metrics(observed: &DVector<f64>, predicted: &DVector<f64>) -> ModelMetrics {
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut ape = 0.0;
    for (y, p) in observed.iter().zip(predicted.iter()) {
        ss_res += (y - p).powi(2);
        ss_tot += (y - mean).powi(2);
        ape += ((y - p) / y).abs();
    }

    ModelMetrics {
        rmse: (ss_res / n).sqrt(),
        r2: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
        mape: ape / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::PropertyCategory;
    use approx::assert_abs_diff_eq;

    /// 100 rows with a planted linear price structure across mixed
    /// categories and departments.
    fn synthetic_records(n: usize) -> Vec<Transaction> {
        (0..n)
            .map(|i| {
                let category = if i % 3 == 0 {
                    PropertyCategory::Apartment
                } else {
                    PropertyCategory::House
                };
                let surface = 40.0 + (i % 25) as f64 * 6.0;
                let rooms = 1 + (i % 6) as u32;
                let department = ["13", "33", "69", "75"][i % 4];
                let value =
                    surface * 2500.0 + rooms as f64 * 8000.0 + (i % 4) as f64 * 15_000.0;
                Transaction {
                    date: format!("{:02}/03/2025", i % 28 + 1),
                    parsed_date: None,
                    value,
                    category,
                    surface,
                    rooms,
                    price_m2: value / surface,
                    department: department.to_string(),
                }
            })
            .collect()
    }

    #[test]
    fn test_metrics_on_perfect_prediction() {
        let y = DVector::from_vec(vec![100.0, 200.0, 300.0]);
        let metrics = compute_metrics(&y, &y);
        assert_abs_diff_eq!(metrics.rmse, 0.0);
        assert_abs_diff_eq!(metrics.r2, 1.0);
        assert_abs_diff_eq!(metrics.mape, 0.0);
    }

    #[test]
    fn test_metrics_known_values() {
        let y = DVector::from_vec(vec![100.0, 200.0]);
        let p = DVector::from_vec(vec![110.0, 190.0]);
        let metrics = compute_metrics(&y, &p);
        // Both errors are 10, so RMSE is 10
        assert_abs_diff_eq!(metrics.rmse, 10.0, epsilon = 1e-12);
        // MAPE = (10/100 + 10/200) / 2
        assert_abs_diff_eq!(metrics.mape, 0.075, epsilon = 1e-12);
        // SS_res = 200, SS_tot = 5000
        assert_abs_diff_eq!(metrics.r2, 1.0 - 200.0 / 5000.0, epsilon = 1e-12);
    }

    #[test]
    fn test_comparison_shape_and_selection_rule() {
        let records = synthetic_records(100);
        let config = RunConfig::new("unused.zip", "out");

        let comparison = compare_models(&records, &config).unwrap();
        assert_eq!(comparison.scores.len(), 3);

        // Declaration order is preserved
        assert_eq!(comparison.scores[0].0, "linear_regression");
        assert_eq!(comparison.scores[1].0, "random_forest");
        assert_eq!(comparison.scores[2].0, "gradient_boosting");

        let best_rmse = comparison
            .scores
            .iter()
            .find(|(name, _)| *name == comparison.best_model)
            .map(|(_, m)| m.rmse)
            .unwrap();
        for (_, metrics) in &comparison.scores {
            assert!(metrics.rmse >= 0.0);
            assert!(metrics.mape >= 0.0);
            assert!(best_rmse <= metrics.rmse);
        }
    }

    #[test]
    fn test_comparison_is_deterministic() {
        let records = synthetic_records(100);
        let config = RunConfig::new("unused.zip", "out");

        let a = compare_models(&records, &config).unwrap();
        let b = compare_models(&records, &config).unwrap();
        assert_eq!(a.best_model, b.best_model);
        for ((_, ma), (_, mb)) in a.scores.iter().zip(b.scores.iter()) {
            assert_abs_diff_eq!(ma.rmse, mb.rmse);
            assert_abs_diff_eq!(ma.r2, mb.r2);
            assert_abs_diff_eq!(ma.mape, mb.mape);
        }
    }

    #[test]
    fn test_best_pipeline_predicts_on_held_out_rows() {
        let records = synthetic_records(100);
        let config = RunConfig::new("unused.zip", "out");

        let comparison = compare_models(&records, &config).unwrap();
        let (_, test) = train_test_split(records.len(), config.test_fraction, config.split_seed);
        let predicted = comparison.best_pipeline.predict_records(&records, &test);
        assert_eq!(predicted.len(), test.len());
        assert!(predicted.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_too_few_records_is_fatal() {
        let records = synthetic_records(1);
        let config = RunConfig::new("unused.zip", "out");
        let err = compare_models(&records, &config).unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }
}
