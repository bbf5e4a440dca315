//! Register snapshots and sample logs
//!
//! A snapshot is a JSON object of `address -> word`. A sample log is a CSV
//! file with a `timestamp,address,word` header; rows sharing a timestamp form
//! one poll cycle.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use gridlink_registers::{EntityDescriptor, RegisterWords, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One poll cycle recovered from a sample log
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub words: RegisterWords,
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    timestamp: DateTime<Utc>,
    address: u16,
    word: u16,
}

/// Parse a JSON snapshot such as `{"11000": 2301, "11001": 52}`
pub fn parse_words_json(json: &str) -> Result<RegisterWords> {
    let words: BTreeMap<u16, u16> =
        serde_json::from_str(json).context("Register snapshot must map addresses to words")?;
    Ok(RegisterWords::from(words))
}

/// Parse sample log content into snapshots ordered by timestamp
///
/// # Arguments
/// * `content` - CSV text including the header row
/// * `origin` - Name used in error messages (usually the file path)
pub fn parse_samples(content: &str, origin: &str) -> Result<Vec<Snapshot>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut cycles: BTreeMap<DateTime<Utc>, RegisterWords> = BTreeMap::new();
    for (index, result) in reader.deserialize::<SampleRow>().enumerate() {
        // +2: header line and 1-based numbering
        let row = result.with_context(|| {
            format!("Failed to parse CSV row {} in {}", index + 2, origin)
        })?;
        cycles
            .entry(row.timestamp)
            .or_default()
            .insert(row.address, row.word);
    }

    Ok(cycles
        .into_iter()
        .map(|(timestamp, words)| Snapshot { timestamp, words })
        .collect())
}

/// Read and parse a sample log file
pub async fn load_samples(path: &Path) -> Result<Vec<Snapshot>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    parse_samples(&content, &path.display().to_string())
}

/// Interpret a command line value for `entity`
///
/// Selects take an option label; everything else takes a number.
pub fn parse_value(entity: &EntityDescriptor, raw: &str) -> Result<Value> {
    match entity {
        EntityDescriptor::Select(_) => Ok(Value::Label(raw.to_string())),
        _ => {
            let number: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("'{}' expects a number, got '{}'", entity.key(), raw))?;
            Ok(Value::Number(number))
        },
    }
}
