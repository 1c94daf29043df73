use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuditConfig {
    /// Directory holding `audit.log`, `security.log` and the `archive`
    /// directory. Default: `<data_path>/audit`.
    #[serde(default = "AuditConfig::default_dir")]
    pub dir: String,

    /// Archived logs older than this many days are deleted.
    #[serde(default = "AuditConfig::default_retention_days")]
    pub retention_days: u64,

    /// How often the writer checks for a day change while idle.
    #[serde(default = "AuditConfig::default_rotation_check_secs")]
    pub rotation_check_secs: u64,

    /// Records buffered between request handlers and the writer. Once full,
    /// new records are dropped with a warning.
    #[serde(default = "AuditConfig::default_channel_capacity")]
    pub channel_capacity: usize,

    /// Print security alerts to stderr.
    #[serde(default = "AuditConfig::default_console_alerts")]
    pub console_alerts: bool,

    #[serde(skip)]
    pub dir_path: PathBuf,
}

impl CommonConfig for AuditConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            retention_days: Self::default_retention_days(),
            rotation_check_secs: Self::default_rotation_check_secs(),
            channel_capacity: Self::default_channel_capacity(),
            console_alerts: Self::default_console_alerts(),
            dir_path: PathBuf::new(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.dir_path = if self.dir.is_empty() {
            ps.data_path.join("audit")
        } else {
            PathBuf::from(expandenv("dir", &self.dir)?)
        };

        if self.retention_days == 0 {
            bail!("retention_days should not be 0");
        }
        if self.rotation_check_secs == 0 {
            bail!("rotation_check_secs should not be 0");
        }
        if self.channel_capacity == 0 {
            bail!("channel_capacity should not be 0");
        }

        Ok(())
    }
}

impl AuditConfig {
    pub fn default_dir() -> String {
        String::new()
    }

    pub fn default_retention_days() -> u64 {
        30
    }

    pub fn default_rotation_check_secs() -> u64 {
        60
    }

    pub fn default_channel_capacity() -> usize {
        1024
    }

    pub fn default_console_alerts() -> bool {
        true
    }
}
