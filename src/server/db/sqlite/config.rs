use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

use super::SqliteConnection;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SqliteConfig {
    #[serde(default = "SqliteConfig::default_memory")]
    pub memory: bool,

    /// Default: {data_path}/gatekeep.db
    #[serde(default = "SqliteConfig::default_path")]
    pub path: String,
}

impl CommonConfig for SqliteConfig {
    fn default() -> Self {
        Self {
            memory: Self::default_memory(),
            path: Self::default_path(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        if self.memory {
            return Ok(());
        }

        self.path = expandenv("path", &self.path)?;
        if self.path.is_empty() {
            let path = ps.data_path.join("gatekeep.db");
            self.path = format!("{}", path.display());
        }

        Ok(())
    }
}

impl SqliteConfig {
    pub(in crate::server::db) fn build(&self) -> Result<SqliteConnection> {
        if self.memory {
            warn!("Using in-memory sqlite database, the data will be lost when the server stops");
            return SqliteConnection::memory();
        }

        info!("Using sqlite database: {}", self.path);
        SqliteConnection::open(self.path.as_ref())
    }

    fn default_memory() -> bool {
        false
    }

    fn default_path() -> String {
        String::new()
    }
}
