// revpipe-config - Pipeline configuration
//
// The pipeline is configured by a single JSON file handed to the CLI via
// --config-path. Recognised keys:
//   source_type    "local" | "api"
//   source_config  per-source settings (validated against source_type)
//   db_config      store engine selection + engine-specific settings
//   archive_path   root under which tmp/, error/, success/ are created

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

mod validation;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source_type: SourceType,

    pub source_config: SourceConfig,

    pub db_config: DbConfig,

    pub archive_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Local,
    Api,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Local => write!(f, "local"),
            SourceType::Api => write!(f, "api"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(SourceType::Local),
            "api" => Ok(SourceType::Api),
            _ => anyhow::bail!("Unsupported source type: {}. Supported: local, api", s),
        }
    }
}

/// Source settings. The JSON carries one object for either source type;
/// validation checks the fields the selected type requires.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    // local source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_column_separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_row_separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations_path: Option<PathBuf>,

    // api source (reserved shape; the extractor is a stub)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations_endpoint: Option<String>,
}

impl SourceConfig {
    /// Row separator for inventory CSV files, newline when unset.
    pub fn inventory_row_separator(&self) -> &str {
        self.inventory_row_separator.as_deref().unwrap_or("\n")
    }

    /// Column separator for inventory CSV files, comma when unset.
    pub fn inventory_column_separator(&self) -> &str {
        self.inventory_column_separator.as_deref().unwrap_or(",")
    }
}

/// Store engine selection. `engine` picks an implementation out of the
/// engine registry; the remaining keys are engine-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub engine: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    #[serde(flatten)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl PipelineConfig {
    /// Load and validate a configuration JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            anyhow::anyhow!("Configuration JSON file '{}' not readable: {err}", path.display())
        })?;
        let config: PipelineConfig = serde_json::from_str(&raw).map_err(|err| {
            anyhow::anyhow!("Configuration JSON file '{}' is invalid: {err}", path.display())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn local_config_json() -> serde_json::Value {
        serde_json::json!({
            "source_type": "local",
            "source_config": {
                "inventory_path": "drop/inventory",
                "inventory_column_separator": ",",
                "inventory_row_separator": "\n",
                "reservations_path": "drop/reservations"
            },
            "db_config": {
                "engine": "sqlite",
                "db_path": "data/revpipe.db"
            },
            "archive_path": "archive"
        })
    }

    #[test]
    fn test_load_local_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", local_config_json()).unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.source_type, SourceType::Local);
        assert_eq!(config.db_config.engine, "sqlite");
        assert_eq!(config.source_config.inventory_column_separator(), ",");
    }

    #[test]
    fn test_source_type_from_str() {
        assert_eq!("local".parse::<SourceType>().unwrap(), SourceType::Local);
        assert_eq!("API".parse::<SourceType>().unwrap(), SourceType::Api);
        assert!("ftp".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = PipelineConfig::load("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("not readable"));
    }

    #[test]
    fn test_engine_specific_options_are_kept() {
        let mut json = local_config_json();
        json["db_config"]["read_only_hint"] = serde_json::json!(true);
        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert!(config.db_config.options.contains_key("read_only_hint"));
    }
}
