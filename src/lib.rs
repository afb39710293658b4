// DVF Analysis Pipeline - Core Library
// Exposes all pipeline stages for use in the CLI binary and tests

pub mod compare;
pub mod config;
pub mod features;
pub mod ingest;
pub mod models;
pub mod report;

// Re-export commonly used types
pub use compare::{compare_models, Comparison, ModelMetrics};
pub use config::{OutputPaths, RunConfig, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED};
pub use features::{train_test_split, FeatureEncoder};
pub use ingest::{load_and_clean, parse_monetary, PropertyCategory, Transaction};
pub use models::{FittedPipeline, ModelKind, Regressor};
pub use report::{
    render_histogram, render_scatter, write_clean_sample, write_model_results,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
