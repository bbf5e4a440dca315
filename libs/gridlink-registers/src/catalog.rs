//! Catalog loading
//!
//! A catalog document holds named families of entity descriptors plus the
//! models that stitch families together:
//!
//! ```yaml
//! families:
//!   h1:
//!     - kind: sensor
//!       key: pv1_voltage
//!       addresses: [11000]
//!       ...
//!   h1_ac1: [...]
//! models:
//!   H1: [h1, h1_ac1]
//!   AC1: [ac1, h1_ac1]
//! ```
//!
//! Every model is resolved and checked when the catalog is loaded, so a bad
//! descriptor is a startup error rather than a surprise on the first poll.

use crate::descriptor::{EntityDescriptor, IntegrationDescriptor, SensorDescriptor};
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Catalog document as written on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Family name -> ordered descriptors
    #[serde(default)]
    pub families: BTreeMap<String, Vec<EntityDescriptor>>,
    /// Model name -> ordered family names
    #[serde(default)]
    pub models: BTreeMap<String, Vec<String>>,
}

/// Descriptors for one hardware model, in catalog order
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    name: String,
    entities: Vec<EntityDescriptor>,
    index: HashMap<String, usize>,
}

impl ResolvedModel {
    /// Concatenate families in order and check every invariant
    fn resolve(name: &str, document: &CatalogDocument) -> Result<Self> {
        let family_names = document
            .models
            .get(name)
            .ok_or_else(|| CatalogError::ModelNotFound(name.to_string()))?;

        let mut entities = Vec::new();
        let mut index = HashMap::new();

        for family in family_names {
            let descriptors =
                document
                    .families
                    .get(family)
                    .ok_or_else(|| CatalogError::UnknownFamily {
                        model: name.to_string(),
                        family: family.clone(),
                    })?;

            for entity in descriptors {
                entity.check()?;
                if index.insert(entity.key().to_string(), entities.len()).is_some() {
                    return Err(CatalogError::DuplicateKey {
                        model: name.to_string(),
                        key: entity.key().to_string(),
                    });
                }
                entities.push(entity.clone());
            }
        }

        let model = Self {
            name: name.to_string(),
            entities,
            index,
        };
        model.check_sources()?;
        Ok(model)
    }

    /// Every integration must draw from a numeric, register-backed entity
    fn check_sources(&self) -> Result<()> {
        for integration in self.integrations() {
            match self.get(&integration.source) {
                None => {
                    return Err(CatalogError::invalid(
                        &integration.key,
                        format!(
                            "source '{}' not found in model '{}'",
                            integration.source, self.name
                        ),
                    ))
                },
                Some(EntityDescriptor::Integration(_)) => {
                    return Err(CatalogError::invalid(
                        &integration.key,
                        format!("source '{}' is itself an integration", integration.source),
                    ))
                },
                Some(source) if !source.is_numeric() => {
                    return Err(CatalogError::invalid(
                        &integration.key,
                        format!("source '{}' is not numeric", integration.source),
                    ))
                },
                Some(_) => {},
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All entities in catalog order
    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    pub fn get(&self, key: &str) -> Option<&EntityDescriptor> {
        self.index.get(key).map(|&i| &self.entities[i])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorDescriptor> {
        self.entities.iter().filter_map(|e| match e {
            EntityDescriptor::Sensor(d) => Some(d),
            _ => None,
        })
    }

    pub fn integrations(&self) -> impl Iterator<Item = &IntegrationDescriptor> {
        self.entities.iter().filter_map(|e| match e {
            EntityDescriptor::Integration(d) => Some(d),
            _ => None,
        })
    }

    /// Count of entities per kind, e.g. `{"sensor": 40, "select": 1}`
    pub fn kind_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entity in &self.entities {
            *counts.entry(entity.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Every register address the model decodes from
    pub fn required_addresses(&self) -> BTreeSet<u16> {
        self.entities
            .iter()
            .filter_map(EntityDescriptor::layout)
            .flat_map(|layout| layout.addresses.iter().copied())
            .collect()
    }
}

/// A loaded catalog with every model resolved
#[derive(Debug, Clone)]
pub struct Catalog {
    models: BTreeMap<String, Arc<ResolvedModel>>,
}

impl Catalog {
    /// Resolve and check every model of a parsed document
    pub fn from_document(document: &CatalogDocument) -> Result<Self> {
        let mut models = BTreeMap::new();
        for name in document.models.keys() {
            let model = ResolvedModel::resolve(name, document)?;
            debug!(model = %name, entities = model.len(), "model resolved");
            models.insert(name.clone(), Arc::new(model));
        }

        info!(
            families = document.families.len(),
            models = models.len(),
            "catalog loaded"
        );
        Ok(Self { models })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let document: CatalogDocument = serde_yaml::from_str(content)?;
        Self::from_document(&document)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(content)?;
        Self::from_document(&document)
    }

    /// Load a catalog file, choosing the parser by extension
    ///
    /// `.json` is parsed as JSON; `.yaml`, `.yml` and anything else as YAML.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Resolved model by name
    pub fn model(&self, name: &str) -> Result<Arc<ResolvedModel>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::ModelNotFound(name.to_string()))
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ResolvedModel>> {
        self.models.values()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    const BASE: &str = r#"
families:
  pv:
    - kind: sensor
      key: pv1_power
      addresses: [11002]
      name: PV1 Power
      scale: 0.001
    - kind: integration
      key: pv1_energy_total
      source: pv1_power
      name: PV1 Power Total
  shared:
    - kind: select
      key: work_mode
      address: 41000
      name: Work Mode
      options:
        - { value: 0, label: Self Use }
        - { value: 1, label: Feed-in First }
models:
  H1: [pv, shared]
  AC1: [shared]
"#;

    #[test]
    fn test_resolve_models() {
        let catalog = Catalog::from_yaml_str(BASE).unwrap();
        let h1 = catalog.model("H1").unwrap();
        assert_eq!(h1.len(), 3);
        assert_eq!(h1.entities()[0].key(), "pv1_power");
        assert_eq!(h1.integrations().count(), 1);
        assert_eq!(h1.required_addresses(), BTreeSet::from([11002, 41000]));

        let ac1 = catalog.model("AC1").unwrap();
        assert_eq!(ac1.len(), 1);
        assert!(ac1.get("pv1_power").is_none());
        assert_eq!(ac1.kind_counts().get("select"), Some(&1));
    }

    #[test]
    fn test_unknown_model() {
        let catalog = Catalog::from_yaml_str(BASE).unwrap();
        assert!(matches!(
            catalog.model("H3").unwrap_err(),
            CatalogError::ModelNotFound(_)
        ));
    }

    #[test]
    fn test_duplicate_key_across_families() {
        let yaml = BASE.replace("AC1: [shared]", "AC1: [shared, shared]");
        let err = Catalog::from_yaml_str(&yaml).unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateKey {
                model: "AC1".to_string(),
                key: "work_mode".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_family() {
        let yaml = BASE.replace("AC1: [shared]", "AC1: [ac1]");
        assert!(matches!(
            Catalog::from_yaml_str(&yaml).unwrap_err(),
            CatalogError::UnknownFamily { .. }
        ));
    }

    #[test]
    fn test_integration_source_must_exist() {
        let yaml = BASE.replace("source: pv1_power", "source: pv9_power");
        assert!(matches!(
            Catalog::from_yaml_str(&yaml).unwrap_err(),
            CatalogError::InvalidDescriptor { .. }
        ));
    }

    #[test]
    fn test_integration_source_must_be_numeric() {
        let yaml = BASE.replace("source: pv1_power", "source: work_mode");
        assert!(Catalog::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_zero_scale_is_fatal() {
        let yaml = BASE.replace("scale: 0.001", "scale: 0");
        assert!(matches!(
            Catalog::from_yaml_str(&yaml).unwrap_err(),
            CatalogError::InvalidDescriptor { .. }
        ));
    }

    #[test]
    fn test_json_catalog() {
        let json = r#"{
            "families": {
                "f": [
                    { "kind": "sensor", "key": "grid_ct", "addresses": [11021],
                      "name": "Grid CT", "scale": 0.001 }
                ]
            },
            "models": { "M": ["f"] }
        }"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        assert_eq!(catalog.model("M").unwrap().sensors().count(), 1);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Catalog::from_yaml_str("families: [").unwrap_err(),
            CatalogError::Parse(_)
        ));
    }
}
