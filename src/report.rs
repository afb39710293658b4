// Reporting
// Writes the four run artifacts: cleaned-sample CSV, metrics JSON and the
// two diagnostic figures (price-per-m² histogram, observed vs predicted).

use anyhow::{ensure, Context, Result};
use log::info;
use plotters::prelude::*;
use serde_json::Value;
use std::cmp::Ordering;
use std::fs::File;
use std::path::Path;

use crate::compare::{Comparison, BEST_MODEL_KEY};
use crate::config::RunConfig;
use crate::features::{target_vector, train_test_split};
use crate::ingest::Transaction;

/// Header of the cleaned-sample export, mirroring the source column names
/// plus the derived fields.
const SAMPLE_HEADER: [&str; 7] = [
    "Date mutation",
    "Valeur fonciere num",
    "Type local",
    "Surface reelle bati",
    "Nombre pieces principales",
    "prix_m2",
    "Code departement",
];

const HIST_BINS: usize = 50;
const HIST_QUANTILE: f64 = 0.95;
const FIGURE_SIZE: (u32, u32) = (900, 600);

/// Write the cleaned/sampled record set as a delimited table with header.
pub fn write_clean_sample(records: &[Transaction], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(SAMPLE_HEADER)?;
    for record in records {
        writer.write_record(&[
            record.date.clone(),
            record.value.to_string(),
            record.category.label().to_string(),
            record.surface.to_string(),
            record.rooms.to_string(),
            record.price_m2.to_string(),
            record.department.clone(),
        ])?;
    }
    writer.flush()?;
    info!("Clean sample written to {} ({} rows)", path.display(), records.len());
    Ok(())
}

/// Serialize per-model metrics plus the `_best_model` identifier.
pub fn write_model_results(comparison: &Comparison, path: &Path) -> Result<()> {
    let mut doc = serde_json::Map::new();
    for (name, metrics) in &comparison.scores {
        doc.insert(name.clone(), serde_json::to_value(metrics)?);
    }
    doc.insert(
        BEST_MODEL_KEY.to_string(),
        Value::String(comparison.best_model.clone()),
    );

    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, &Value::Object(doc))?;
    info!("Model results written to {}", path.display());
    Ok(())
}

/// Quantile with linear interpolation between order statistics.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
    }
}

/// Render the price-per-m² frequency histogram, censored above the 95th
/// percentile. Censoring is visual only and never feeds back into modeling.
pub fn render_histogram(records: &[Transaction], path: &Path) -> Result<()> {
    let prices: Vec<f64> = records
        .iter()
        .map(|r| r.price_m2)
        .filter(|v| v.is_finite())
        .collect();
    ensure!(!prices.is_empty(), "no price-per-m² values to plot");

    let cutoff = percentile(&prices, HIST_QUANTILE);
    let censored: Vec<f64> = prices.into_iter().filter(|&v| v <= cutoff).collect();

    let min = censored.iter().copied().fold(f64::INFINITY, f64::min);
    let max = if cutoff > min { cutoff } else { min + 1.0 };
    let bin_width = (max - min) / HIST_BINS as f64;

    let mut counts = vec![0u32; HIST_BINS];
    for value in &censored {
        let mut bin = ((value - min) / bin_width) as usize;
        if bin >= HIST_BINS {
            bin = HIST_BINS - 1;
        }
        counts[bin] += 1;
    }
    let y_max = counts.iter().copied().max().unwrap_or(1).max(1);

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(min..max, 0u32..y_max + y_max / 10 + 1)?;

    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        let x0 = min + i as f64 * bin_width;
        Rectangle::new([(x0, 0), (x0 + bin_width, count)], BLUE.filled())
    }))?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Histogram written to {}", path.display());
    Ok(())
}

/// Render observed vs predicted monetary value for the best pipeline on the
/// re-derived held-out partition (same seed, same feature contract).
pub fn render_scatter(
    records: &[Transaction],
    comparison: &Comparison,
    config: &RunConfig,
    path: &Path,
) -> Result<()> {
    let (_, test) = train_test_split(records.len(), config.test_fraction, config.split_seed);
    ensure!(!test.is_empty(), "no held-out rows to plot");

    let observed = target_vector(records, &test);
    let predicted = comparison.best_pipeline.predict_records(records, &test);

    let lo = observed
        .iter()
        .chain(predicted.iter())
        .copied()
        .fold(f64::INFINITY, f64::min);
    let hi = observed
        .iter()
        .chain(predicted.iter())
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let pad = ((hi - lo) * 0.05).max(1.0);
    let (lo, hi) = (lo - pad, hi + pad);

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(lo..hi, lo..hi)?;

    // Identity reference line, then the point cloud
    chart.draw_series(LineSeries::new(vec![(lo, lo), (hi, hi)], &RED))?;
    chart.draw_series(
        observed
            .iter()
            .zip(predicted.iter())
            .map(|(&y, &p)| Circle::new((y, p), 2, BLUE.mix(0.5).filled())),
    )?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Scatter plot written to {}", path.display());
    Ok(())
}
