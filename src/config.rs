// Run configuration
// All run state (paths, sample cap, seeds) travels through this struct so
// every stage can be invoked deterministically from tests.

use std::path::PathBuf;

/// Default cap on the cleaned set fed to modeling and export.
pub const DEFAULT_SAMPLE_SIZE: usize = 50_000;

/// Seed used by default for subsampling, splitting and bagging.
pub const DEFAULT_SEED: u64 = 42;

/// Held-out share of the cleaned set used for evaluation.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the zipped DVF archive.
    pub input: PathBuf,

    /// Prefix every output artifact path is derived from.
    pub output_prefix: String,

    /// Upper bound on the cleaned set; `None` means no cap.
    pub sample_size: Option<usize>,

    /// Seed for the uniform subsample of the cleaned set.
    pub sample_seed: u64,

    /// Seed for the train/test partition shared by all models.
    pub split_seed: u64,

    /// Seed for the bootstrap draws of the bagged ensemble.
    pub forest_seed: u64,

    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, output_prefix: impl Into<String>) -> Self {
        RunConfig {
            input: input.into(),
            output_prefix: output_prefix.into(),
            sample_size: Some(DEFAULT_SAMPLE_SIZE),
            sample_seed: DEFAULT_SEED,
            split_seed: DEFAULT_SEED,
            forest_seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
        }
    }

    /// Builder pattern: override the sample cap (`None` disables it)
    pub fn with_sample_size(mut self, sample_size: Option<usize>) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Builder pattern: use one seed for sampling, splitting and bagging
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sample_seed = seed;
        self.split_seed = seed;
        self.forest_seed = seed;
        self
    }

    /// Derive the four artifact paths from the output prefix.
    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            clean_sample: PathBuf::from(format!("{}_clean_sample.csv", self.output_prefix)),
            model_results: PathBuf::from(format!("{}_model_results.json", self.output_prefix)),
            fig_hist: PathBuf::from(format!("{}_fig_hist.png", self.output_prefix)),
            fig_scatter: PathBuf::from(format!("{}_fig_scatter.png", self.output_prefix)),
        }
    }
}

/// Deterministic artifact locations for one run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub clean_sample: PathBuf,
    pub model_results: PathBuf,
    pub fig_hist: PathBuf,
    pub fig_scatter: PathBuf,
}
