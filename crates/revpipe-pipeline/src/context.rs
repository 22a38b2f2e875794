//! Pipeline context: configuration plus the resolved store engine

use anyhow::{Context as _, Result};
use std::path::Path;
use tracing::info;

use revpipe_config::PipelineConfig;
use revpipe_store::{create_engine, StoreEngine};

/// Everything a pipeline entry point needs: the validated configuration
/// and a store engine resolved from the registry.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub engine: Box<dyn StoreEngine>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl PipelineContext {
    /// Load configuration, resolve the engine, and prepare the schema.
    /// Read-only contexts (reporting) skip DDL but still smoke-test the
    /// connection.
    pub fn init(config_path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        info!("Loading pipeline configuration...");
        let config = PipelineConfig::load(config_path)?;

        info!(engine = %config.db_config.engine, "Initializing store engine...");
        let engine = create_engine(&config.db_config).context("Error initializing store engine")?;

        if read_only {
            if !engine.validate_connection() {
                anyhow::bail!("store connection validation failed");
            }
        } else {
            engine.init_schema().context("Error initializing store schema")?;
        }

        Ok(Self { config, engine })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, engine: &str) -> std::path::PathBuf {
        let config = serde_json::json!({
            "source_type": "local",
            "source_config": {
                "inventory_path": dir.path().join("drop/inventory"),
                "inventory_column_separator": ",",
                "inventory_row_separator": "\n",
                "reservations_path": dir.path().join("drop/reservations"),
            },
            "db_config": {
                "engine": engine,
                "db_path": dir.path().join("data/revpipe.db"),
            },
            "archive_path": dir.path().join("archive"),
        });
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{config}").unwrap();
        path
    }

    #[test]
    fn test_init_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "sqlite");

        let context = PipelineContext::init(&path, false).unwrap();
        assert!(context.engine.validate_connection());
        let outcome = context
            .engine
            .execute("SELECT COUNT(*) AS n FROM reservation_imports", false)
            .unwrap();
        assert!(outcome.as_table().is_some());
    }

    #[test]
    fn test_init_rejects_unknown_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "warehouse9000");
        let err = PipelineContext::init(&path, false).unwrap_err();
        assert!(format!("{err:#}").contains("warehouse9000"));
    }
}
