//! CLI Common Utilities
//!
//! Shared context loading for CLI commands.

use std::sync::Arc;

use crate::config::{Config, ConfigLoader};
use crate::generation::{GenerationService, RateBudget, SharedRateBudget};
use crate::storage::{Database, FileStore, SharedDatabase};
use crate::types::Result;

/// Command execution context
///
/// Created via `CommandContext::load()`; generation commands additionally
/// call [`CommandContext::generation_service`], which needs an API key.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub db: SharedDatabase,
    pub store: FileStore,
    /// One budget for every request issued by this process
    pub budget: SharedRateBudget,
}

impl CommandContext {
    /// Load config, open (and migrate) the file index
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::load()?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let db = Database::open(&config.storage.database_path)?;
        db.initialize()?;

        let store = FileStore::new(config.storage.file_dir.clone());
        let budget = Arc::new(RateBudget::from_config(&config.rate_limit));

        Ok(Self {
            config,
            db: Arc::new(db),
            store,
            budget,
        })
    }

    pub fn generation_service(&self) -> Result<GenerationService> {
        GenerationService::from_config(&self.config, Arc::clone(&self.budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_opens_storage() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.database_path = dir.path().join("data").join("files.db");
        config.storage.file_dir = dir.path().join("data").join("file_storage");

        let ctx = CommandContext::from_config(config).unwrap();

        assert!(dir.path().join("data").join("files.db").exists());
        assert_eq!(ctx.store.root(), dir.path().join("data").join("file_storage"));
        assert_eq!(ctx.budget.stats().limit, 5);
    }
}
