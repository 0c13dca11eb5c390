use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::error::ConfigError;
use crate::proctor::DEFAULT_MAX_WARNINGS;

/// Highest warning threshold a config may set
pub const MAX_WARNINGS_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub participant_id: Option<String>,
    pub department: Option<String>,
    pub max_warnings: u32,
    pub notice_delay_secs: u64,
    pub quiz_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            participant_id: None,
            department: None,
            max_warnings: DEFAULT_MAX_WARNINGS,
            notice_delay_secs: 3,
            quiz_dir: None,
            db_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_warnings == 0 {
            return Err(ConfigError::ZeroMaxWarnings);
        }
        if self.max_warnings > MAX_WARNINGS_LIMIT {
            return Err(ConfigError::MaxWarningsTooHigh {
                value: self.max_warnings,
                limit: MAX_WARNINGS_LIMIT,
            });
        }
        Ok(())
    }

    pub fn notice_delay(&self) -> Duration {
        Duration::from_secs(self.notice_delay_secs)
    }

    /// Participant from config, then `$USER`, then "anonymous"
    pub fn resolved_participant(&self) -> String {
        self.participant_id
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("quizlock_attempts.db"))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("quizlock_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
