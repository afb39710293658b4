use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use dvf_analyzer::{
    compare_models, load_and_clean, render_histogram, render_scatter, write_clean_sample,
    write_model_results, RunConfig, DEFAULT_SAMPLE_SIZE,
};

/// Exploratory analysis of a DVF land-transaction archive: cleans the
/// table, compares three regression models on transaction value and writes
/// a sample CSV, a metrics JSON and two diagnostic figures.
#[derive(Parser, Debug)]
#[command(name = "dvf-analyzer", version, about)]
struct Cli {
    /// Path to the zipped DVF file (valeursfoncieres-*.txt.zip)
    #[arg(long)]
    input: PathBuf,

    /// Prefix the four output paths are derived from
    #[arg(long)]
    output_prefix: String,

    /// Cap on the cleaned set used for modeling and export
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = RunConfig::new(&cli.input, &cli.output_prefix)
        .with_sample_size(Some(cli.sample));

    // 1. Load, clean and subsample
    let records = load_and_clean(&config)?;
    println!("✓ Cleaned sample ready ({} rows)", records.len());

    // 2. Fit and score the candidate models on the shared partition
    let comparison = compare_models(&records, &config)?;
    println!("✓ Best model: {}", comparison.best_model);

    // 3. Write all four artifacts (only reached when every stage succeeded)
    let paths = config.output_paths();
    write_clean_sample(&records, &paths.clean_sample)?;
    write_model_results(&comparison, &paths.model_results)?;
    render_histogram(&records, &paths.fig_hist)?;
    render_scatter(&records, &comparison, &config, &paths.fig_scatter)?;

    println!("{}", paths.clean_sample.display());
    println!("{}", paths.model_results.display());
    println!("{}", paths.fig_hist.display());
    println!("{}", paths.fig_scatter.display());

    Ok(())
}
