//! Command implementations
//!
//! Each command returns plain data; printing lives in `main.rs`.

use anyhow::{Context, Result};
use gridlink_calc::{CycleReport, InverterPipeline};
use gridlink_registers::{
    encode, read_entity, Catalog, EncodedWords, RegisterWords, ResolvedModel, Unavailable, Value,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::samples::{load_samples, parse_value};
use crate::state_file::JsonFileTotalStore;

/// Counts for one resolved model
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub entities: usize,
    pub kinds: BTreeMap<&'static str, usize>,
    pub addresses: usize,
}

/// Result of replaying a sample log
#[derive(Debug, Serialize)]
pub struct ReplaySummary {
    pub cycles: Vec<CycleReport>,
    /// Totals after the last cycle
    pub totals: BTreeMap<String, f64>,
}

impl ReplaySummary {
    /// Cycles in which at least one total could not be persisted
    pub fn cycles_with_persist_failures(&self) -> usize {
        self.cycles
            .iter()
            .filter(|cycle| !cycle.persist_failures().is_empty())
            .count()
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    Catalog::load_file(path).with_context(|| format!("Failed to load catalog: {}", path.display()))
}

/// Load the catalog and resolve `model`
pub fn load_model(catalog: &Path, model: &str) -> Result<Arc<ResolvedModel>> {
    let catalog = load_catalog(catalog)?;
    catalog
        .model(model)
        .with_context(|| format!("Model '{}' not available", model))
}

/// Validate the catalog and summarize every model
pub fn check_catalog(path: &Path) -> Result<Vec<ModelSummary>> {
    let catalog = load_catalog(path)?;
    Ok(catalog
        .models()
        .map(|model| ModelSummary {
            name: model.name().to_string(),
            entities: model.len(),
            kinds: model.kind_counts(),
            addresses: model.required_addresses().len(),
        })
        .collect())
}

/// Decode every register-backed entity of `model` from one snapshot
pub fn decode_snapshot(
    model: &ResolvedModel,
    words: &RegisterWords,
) -> Vec<(String, std::result::Result<Value, Unavailable>)> {
    model
        .entities()
        .iter()
        .filter_map(|entity| {
            read_entity(entity, words).map(|result| (entity.key().to_string(), result))
        })
        .collect()
}

/// Words a write of `raw` to `key` would send
pub fn encode_entity(model: &ResolvedModel, key: &str, raw: &str) -> Result<EncodedWords> {
    let entity = model
        .get(key)
        .with_context(|| format!("Unknown key '{}' in model {}", key, model.name()))?;
    let value = parse_value(entity, raw)?;
    Ok(encode(entity, &value)?)
}

/// Replay a sample log through the pipeline, persisting totals to `state_file`
pub async fn replay(
    model: Arc<ResolvedModel>,
    samples: &Path,
    state_file: &Path,
) -> Result<ReplaySummary> {
    let snapshots = load_samples(samples).await?;
    let store = JsonFileTotalStore::open(state_file)
        .with_context(|| format!("Failed to open state file: {}", state_file.display()))?;
    let pipeline = InverterPipeline::new(model, Arc::new(store))?;

    let cycles: Vec<CycleReport> = snapshots
        .iter()
        .map(|snapshot| pipeline.process(&snapshot.words, snapshot.timestamp))
        .collect();

    let integrators = pipeline.integrators();
    let totals: BTreeMap<String, f64> = integrators
        .keys()
        .into_iter()
        .filter_map(|key| integrators.total(&key).map(|total| (key, total)))
        .collect();

    info!(
        model = %pipeline.model().name(),
        cycles = cycles.len(),
        integrations = totals.len(),
        "replay finished"
    );

    Ok(ReplaySummary { cycles, totals })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn bundled_catalog() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/catalog.yaml")
    }

    #[test]
    fn test_check_bundled_catalog() {
        let summaries = check_catalog(&bundled_catalog()).unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["AC1", "H1"]);

        let h1 = &summaries[1];
        assert_eq!(h1.entities, 61);
        assert_eq!(h1.kinds.get("integration"), Some(&3));
    }

    #[test]
    fn test_unknown_model() {
        let err = load_model(&bundled_catalog(), "X9").unwrap_err();
        assert!(err.to_string().contains("X9"), "{}", err);
    }

    #[test]
    fn test_decode_skips_integrations() {
        let model = load_model(&bundled_catalog(), "H1").unwrap();
        let words: RegisterWords = [(11000, 2301)].into_iter().collect();
        let readings = decode_snapshot(&model, &words);

        assert_eq!(readings.len(), model.len() - 3);
        let (key, first) = &readings[0];
        assert_eq!(key, "pv1_voltage");
        assert!((first.as_ref().unwrap().as_f64().unwrap() - 230.1).abs() < 1e-9);
        assert!(readings
            .iter()
            .all(|(key, _)| !key.ends_with("_energy_total")));
    }

    #[test]
    fn test_encode_entity() {
        let model = load_model(&bundled_catalog(), "H1").unwrap();
        assert_eq!(encode_entity(&model, "min_soc", "20").unwrap(), vec![(41009, 20)]);
        assert!(encode_entity(&model, "min_soc", "5").is_err());
        assert!(encode_entity(&model, "min_soc", "20.5").is_err());
        assert!(encode_entity(&model, "nope", "1").is_err());
        assert!(encode_entity(&model, "pv1_energy_total", "1").is_err());
    }
}
