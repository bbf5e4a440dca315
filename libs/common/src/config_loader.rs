//! Configuration loading
//!
//! Configuration is layered with figment, lowest priority first:
//!
//! 1. `T::default()`
//! 2. the config file, if one is given (YAML, TOML or JSON by extension)
//! 3. environment variables with the given prefix, `__` separating nested
//!    keys (`GRIDCTL_LOG__LEVEL=debug`)

use crate::error::{Error, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Figment for a single file, provider chosen by extension
fn file_figment(path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::config("Config file must have an extension"))?;

    match extension {
        "toml" => Ok(Figment::new().merge(Toml::file(path))),
        "yaml" | "yml" => Ok(Figment::new().merge(Yaml::file(path))),
        "json" => Ok(Figment::new().merge(Json::file(path))),
        _ => Err(Error::config(format!(
            "Unsupported config file format: {}",
            extension
        ))),
    }
}

/// Load configuration from defaults, an optional file and the environment
///
/// # Arguments
/// * `path` - Optional config file; a missing file is an error
/// * `env_prefix` - Environment prefix including the trailing underscore (e.g. `"GRIDCTL_"`)
pub fn load_layered<T>(path: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(Error::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(file_figment(path)?);
    }

    figment
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()
        .map_err(|e| Error::config(format!("Failed to load configuration: {}", e)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
    #[serde(default)]
    struct TestConfig {
        name: String,
        model: String,
        nested: NestedConfig,
    }

    #[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
    #[serde(default)]
    struct NestedConfig {
        enabled: bool,
        level: String,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                name: "default".to_string(),
                model: "H1".to_string(),
                nested: NestedConfig::default(),
            }
        }
    }

    impl Default for NestedConfig {
        fn default() -> Self {
            Self {
                enabled: false,
                level: "info".to_string(),
            }
        }
    }

    #[test]
    fn test_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.yaml");
        std::fs::write(&path, "name: file\nmodel: AC1\nnested:\n  enabled: true\n").unwrap();

        let loaded: TestConfig = load_layered(Some(&path), "COMMONTEST_YAML_").unwrap();
        assert_eq!(loaded.name, "file");
        assert_eq!(loaded.model, "AC1");
        assert!(loaded.nested.enabled);
        assert_eq!(loaded.nested.level, "info");
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.ini");
        std::fs::write(&path, "name = x").unwrap();
        let result = load_layered::<TestConfig>(Some(&path), "COMMONTEST_INI_");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_layered::<TestConfig>(Some(Path::new("/nonexistent/gridctl.yaml")), "X_");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_layered_defaults_file_env() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.toml");
        std::fs::write(&path, "name = \"toml\"\n[nested]\nlevel = \"warn\"\n").unwrap();

        std::env::set_var("COMMONTEST_LAYERED_MODEL", "AC1");
        std::env::set_var("COMMONTEST_LAYERED_NESTED__LEVEL", "debug");
        let loaded: TestConfig = load_layered(Some(&path), "COMMONTEST_LAYERED_").unwrap();
        std::env::remove_var("COMMONTEST_LAYERED_MODEL");
        std::env::remove_var("COMMONTEST_LAYERED_NESTED__LEVEL");

        // file over defaults
        assert_eq!(loaded.name, "toml");
        // env over file
        assert_eq!(loaded.nested.level, "debug");
        assert_eq!(loaded.model, "AC1");
        assert!(!loaded.nested.enabled);
    }

    #[test]
    fn test_layered_defaults_only() {
        let loaded: TestConfig = load_layered(None, "COMMONTEST_UNSET_").unwrap();
        assert_eq!(loaded, TestConfig::default());
    }
}
