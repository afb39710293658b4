// Ingestion & cleaning
// Reads the single pipe-delimited table inside a zipped DVF archive, applies
// the cleaning invariants and returns an optionally subsampled record set.

use anyhow::{bail, ensure, Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use zip::ZipArchive;

use crate::config::RunConfig;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Source columns that must be present in the archive's table.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Date mutation",
    "Nature mutation",
    "Valeur fonciere",
    "Type local",
    "Surface reelle bati",
    "Nombre pieces principales",
    "Code departement",
];

/// Transaction nature kept by the cleaning filter.
pub const NATURE_SALE: &str = "Vente";

/// PropertyCategory - the two local types kept by the cleaning filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyCategory {
    House,
    Apartment,
}

impl PropertyCategory {
    /// Label as it appears in the source table
    pub fn label(&self) -> &str {
        match self {
            PropertyCategory::House => "Maison",
            PropertyCategory::Apartment => "Appartement",
        }
    }

    /// Parse a source label; anything else is filtered out upstream
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Maison" => Some(PropertyCategory::House),
            "Appartement" => Some(PropertyCategory::Apartment),
            _ => None,
        }
    }
}

/// One surviving sale record. Materialized during ingestion, immutable
/// afterward; a row failing any cleaning invariant is dropped, never fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Mutation date as carried by the source
    pub date: String,
    /// Typed date when the source string parses as day/month/year
    pub parsed_date: Option<NaiveDate>,
    /// Monetary value, positive and finite
    pub value: f64,
    pub category: PropertyCategory,
    /// Built surface area, strictly positive
    pub surface: f64,
    /// Main-room count, strictly positive
    pub rooms: u32,
    /// Derived price per m² (value / surface)
    pub price_m2: f64,
    /// Administrative department code
    pub department: String,
}

// ============================================================================
// FIELD PARSING
// ============================================================================

/// Parse a locale-formatted monetary string ("1 234,56") into a float.
///
/// Whitespace thousands separators (including non-breaking spaces) are
/// stripped and the comma decimal separator is rewritten to a dot. A missing
/// or malformed value yields `None` so the caller can drop the row instead of
/// propagating an error.
pub fn parse_monetary(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// Plain dot-decimal numeric field (surface, room count).
fn parse_plain(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

// ============================================================================
// LOADING & CLEANING
// ============================================================================

/// Load the archive named by `config`, clean it and subsample to the cap.
///
/// Fatal conditions: unreadable archive, zero or more than one data entry,
/// missing required column. Per-row problems only drop the row.
pub fn load_and_clean(config: &RunConfig) -> Result<Vec<Transaction>> {
    let file = File::open(&config.input)
        .with_context(|| format!("failed to open archive {}", config.input.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read archive {}", config.input.display()))?;

    let entries: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(|name| name.to_string())
        .collect();
    match entries.len() {
        0 => bail!("archive {} contains no data file", config.input.display()),
        1 => {}
        n => bail!(
            "archive {} is ambiguous: expected exactly one data file, found {}",
            config.input.display(),
            n
        ),
    }

    let entry = archive
        .by_name(&entries[0])
        .with_context(|| format!("failed to open archive entry '{}'", entries[0]))?;
    info!("Reading table '{}' from {}", entries[0], config.input.display());

    let mut records = read_table(entry)?;
    info!("Cleaned set: {} records", records.len());

    if let Some(cap) = config.sample_size {
        records = subsample(records, cap, config.sample_seed);
    }
    Ok(records)
}

/// Parse the pipe-delimited table and keep only rows satisfying every
/// cleaning invariant.
fn read_table<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("unable to read table header")?;
    let mut columns: HashMap<String, usize> = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        columns.insert(name.trim().to_string(), idx);
    }
    for required in REQUIRED_COLUMNS {
        ensure!(
            columns.contains_key(required),
            "required column '{}' not found in table header",
            required
        );
    }

    let date_idx = columns["Date mutation"];
    let nature_idx = columns["Nature mutation"];
    let value_idx = columns["Valeur fonciere"];
    let category_idx = columns["Type local"];
    let surface_idx = columns["Surface reelle bati"];
    let rooms_idx = columns["Nombre pieces principales"];
    let department_idx = columns["Code departement"];

    let mut kept = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        // All five invariants must hold; failing any one drops the row.
        if field(nature_idx) != NATURE_SALE {
            dropped += 1;
            continue;
        }
        let category = match PropertyCategory::from_label(field(category_idx)) {
            Some(category) => category,
            None => {
                dropped += 1;
                continue;
            }
        };
        let value = match parse_monetary(field(value_idx)) {
            Some(v) if v > 0.0 => v,
            _ => {
                dropped += 1;
                continue;
            }
        };
        let surface = match parse_plain(field(surface_idx)) {
            Some(s) if s > 0.0 => s,
            _ => {
                dropped += 1;
                continue;
            }
        };
        let rooms = match parse_plain(field(rooms_idx)) {
            Some(r) if r > 0.0 => r.round() as u32,
            _ => {
                dropped += 1;
                continue;
            }
        };
        if rooms == 0 {
            dropped += 1;
            continue;
        }

        let date = field(date_idx).to_string();
        let parsed_date = NaiveDate::parse_from_str(&date, "%d/%m/%Y").ok();

        kept.push(Transaction {
            date,
            parsed_date,
            value,
            category,
            surface,
            rooms,
            price_m2: value / surface,
            department: field(department_idx).to_string(),
        });
    }

    debug!("Dropped {} rows during cleaning", dropped);
    Ok(kept)
}

/// Uniform random subset of exactly `cap` records when the cleaned set is
/// larger; the full set otherwise. Same seed and same input yield the same
/// subset.
pub fn subsample(records: Vec<Transaction>, cap: usize, seed: u64) -> Vec<Transaction> {
    if records.len() <= cap {
        return records;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..records.len()).collect();
    indices.shuffle(&mut rng);
    indices.truncate(cap);

    let mut selected = Vec::with_capacity(cap);
    let mut records: Vec<Option<Transaction>> = records.into_iter().map(Some).collect();
    for idx in indices {
        if let Some(record) = records[idx].take() {
            selected.push(record);
        }
    }
    selected
}
