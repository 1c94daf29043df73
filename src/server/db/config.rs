use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

use super::SqliteConfig;

/// Database backing the resource lookup registry.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DbConfig {
    #[serde(default = "SqliteConfig::default")]
    pub sqlite: SqliteConfig,
}

impl CommonConfig for DbConfig {
    fn default() -> Self {
        Self {
            sqlite: SqliteConfig::default(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.sqlite.complete(ps).context("sqlite")?;
        Ok(())
    }
}
