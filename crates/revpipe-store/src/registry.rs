//! Engine registry
//!
//! Engines register a factory under a name key; the pipeline context
//! resolves `db_config.engine` through [`create_engine`]. The built-in
//! SQLite engine is pre-registered.

use once_cell::sync::Lazy;
use revpipe_config::DbConfig;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::sqlite::SqliteEngine;
use crate::StoreEngine;

/// Builds an engine from its section of the configuration.
pub type EngineFactory = fn(&DbConfig) -> Result<Box<dyn StoreEngine>>;

static REGISTRY: Lazy<RwLock<BTreeMap<String, EngineFactory>>> = Lazy::new(|| {
    let mut engines: BTreeMap<String, EngineFactory> = BTreeMap::new();
    engines.insert(SqliteEngine::NAME.to_string(), SqliteEngine::factory);
    RwLock::new(engines)
});

/// Register (or replace) an engine factory under `name`.
pub fn register_engine(name: &str, factory: EngineFactory) {
    let mut registry = REGISTRY.write().expect("engine registry poisoned");
    registry.insert(name.to_string(), factory);
}

/// Names currently registered, sorted.
pub fn registered_engines() -> Vec<String> {
    let registry = REGISTRY.read().expect("engine registry poisoned");
    registry.keys().cloned().collect()
}

/// Look up `config.engine` and build the engine.
pub fn create_engine(config: &DbConfig) -> Result<Box<dyn StoreEngine>> {
    let registry = REGISTRY.read().expect("engine registry poisoned");
    let factory = registry.get(&config.engine).ok_or_else(|| StoreError::UnknownEngine {
        name: config.engine.clone(),
        registered: registry.keys().cloned().collect::<Vec<_>>().join(", "),
    })?;
    factory(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_is_preregistered() {
        assert!(registered_engines().iter().any(|name| name == "sqlite"));
    }

    #[test]
    fn test_unknown_engine_names_registered_ones() {
        let config = DbConfig {
            engine: "mystery".into(),
            db_path: None,
            options: Default::default(),
        };
        let err = create_engine(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("mystery"));
        assert!(message.contains("sqlite"));
    }
}
