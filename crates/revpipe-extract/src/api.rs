//! API extractor (reserved interface)
//!
//! The configuration schema reserves an `api` source with a base URL and
//! per-feed endpoints. No backend speaks it yet; both operations return
//! [`ExtractError::ApiNotImplemented`] so a misconfigured deployment
//! fails loudly instead of silently ingesting nothing.

use revpipe_config::{PipelineConfig, SourceType};

use crate::error::{ExtractError, Result};
use crate::{Extractor, InventoryExtract, ReservationExtract};

pub struct ApiExtractor {
    base_url: String,
    inventory_endpoint: String,
    reservations_endpoint: String,
}

impl ApiExtractor {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        if config.source_type != SourceType::Api {
            return Err(ExtractError::Config(format!(
                "api extractor cannot serve source type '{}'",
                config.source_type
            )));
        }
        let source = &config.source_config;
        let field = |name: &str, value: &Option<String>| {
            value
                .clone()
                .ok_or_else(|| ExtractError::Config(format!("source_config.{name} missing")))
        };
        Ok(Self {
            base_url: field("base_url", &source.base_url)?,
            inventory_endpoint: field("inventory_endpoint", &source.inventory_endpoint)?,
            reservations_endpoint: field("reservations_endpoint", &source.reservations_endpoint)?,
        })
    }

    /// Fully-qualified inventory feed URL.
    pub fn inventory_url(&self) -> String {
        join_url(&self.base_url, &self.inventory_endpoint)
    }

    /// Fully-qualified reservations feed URL.
    pub fn reservations_url(&self) -> String {
        join_url(&self.base_url, &self.reservations_endpoint)
    }
}

impl Extractor for ApiExtractor {
    fn extract_inventory(&self) -> Result<Option<InventoryExtract>> {
        Err(ExtractError::ApiNotImplemented)
    }

    fn extract_reservations(&self) -> Result<Vec<ReservationExtract>> {
        Err(ExtractError::ApiNotImplemented)
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), endpoint.trim_start_matches('/'))
}
