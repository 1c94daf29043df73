use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

/// Thresholds and denylists of the anomaly detector.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnomalyConfig {
    /// Largest page size a non-admin caller may request before the request is
    /// flagged as potential scraping. Default: 100.
    #[serde(default = "AnomalyConfig::default_max_page_size")]
    pub max_page_size: u64,

    /// SQL fragments searched for in the decoded query string, compared
    /// case-insensitively.
    #[serde(default = "AnomalyConfig::default_sql_denylist")]
    pub sql_denylist: Vec<String>,

    /// NoSQL operator keys searched for in the request body.
    #[serde(default = "AnomalyConfig::default_nosql_operators")]
    pub nosql_operators: Vec<String>,

    /// Path segments reserved for admin callers.
    #[serde(default = "AnomalyConfig::default_admin_segments")]
    pub admin_segments: Vec<String>,

    /// Log cross-user `users/<id>` access. Never blocks.
    #[serde(default = "AnomalyConfig::default_enumeration_detection")]
    pub enumeration_detection: bool,
}

impl CommonConfig for AnomalyConfig {
    fn default() -> Self {
        Self {
            max_page_size: Self::default_max_page_size(),
            sql_denylist: Self::default_sql_denylist(),
            nosql_operators: Self::default_nosql_operators(),
            admin_segments: Self::default_admin_segments(),
            enumeration_detection: Self::default_enumeration_detection(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if self.max_page_size == 0 {
            bail!("max_page_size should not be 0");
        }

        for list in [
            &mut self.sql_denylist,
            &mut self.nosql_operators,
            &mut self.admin_segments,
        ] {
            list.retain(|s| !s.trim().is_empty());
            for s in list.iter_mut() {
                *s = s.to_lowercase();
            }
        }

        Ok(())
    }
}

impl AnomalyConfig {
    pub fn default_max_page_size() -> u64 {
        100
    }

    pub fn default_sql_denylist() -> Vec<String> {
        [
            "' or '1'='1",
            "' or 1=1",
            "union select",
            "drop table",
            "insert into",
            "delete from",
            "exec(",
            "xp_cmdshell",
            "--",
            "/*",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    pub fn default_nosql_operators() -> Vec<String> {
        ["$where", "$regex", "$ne", "$gt", "$lt", "$in", "$nin", "$or"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn default_admin_segments() -> Vec<String> {
        vec![String::from("admin")]
    }

    pub fn default_enumeration_detection() -> bool {
        true
    }
}
