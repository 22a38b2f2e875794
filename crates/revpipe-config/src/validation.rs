// Configuration validation
//
// Checks that the fields the selected source type and store engine need
// are present and non-empty before the pipeline starts.

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    match config.source_type {
        SourceType::Local => validate_local_source(&config.source_config)?,
        SourceType::Api => validate_api_source(&config.source_config)?,
    }

    validate_db_config(&config.db_config)?;

    if config.archive_path.as_os_str().is_empty() {
        bail!("archive_path must not be empty");
    }

    Ok(())
}

fn validate_local_source(config: &SourceConfig) -> Result<()> {
    let inventory_path = config
        .inventory_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("local source requires source_config.inventory_path"))?;
    if inventory_path.as_os_str().is_empty() {
        bail!("source_config.inventory_path must not be empty");
    }

    let reservations_path = config
        .reservations_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("local source requires source_config.reservations_path"))?;
    if reservations_path.as_os_str().is_empty() {
        bail!("source_config.reservations_path must not be empty");
    }

    if let Some(sep) = &config.inventory_column_separator {
        if sep.is_empty() {
            bail!("source_config.inventory_column_separator must not be empty");
        }
        if sep.len() > 1 {
            warn!(
                separator = sep.as_str(),
                "multi-character column separator; only the first character is used"
            );
        }
    }

    Ok(())
}

fn validate_api_source(config: &SourceConfig) -> Result<()> {
    for (field, value) in [
        ("base_url", &config.base_url),
        ("inventory_endpoint", &config.inventory_endpoint),
        ("reservations_endpoint", &config.reservations_endpoint),
    ] {
        match value {
            Some(v) if !v.trim().is_empty() => {}
            _ => bail!("api source requires source_config.{field}"),
        }
    }
    Ok(())
}

fn validate_db_config(config: &DbConfig) -> Result<()> {
    if config.engine.trim().is_empty() {
        bail!("db_config.engine must not be empty");
    }
    Ok(())
}
