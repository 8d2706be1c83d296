use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::file::{BUFFER_POOL_SIZE, BufferManager, DiskManager, MAX_OPEN_FILES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid config: {0} must be greater than zero")]
    InvalidValue(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables of the storage engine. Missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pages held by the buffer pool
    pub buffer_pool_size: usize,
    /// Files the disk manager keeps open at once
    pub max_open_files: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_pool_size: BUFFER_POOL_SIZE,
            max_open_files: MAX_OPEN_FILES,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.buffer_pool_size == 0 {
            return Err(ConfigError::InvalidValue("buffer_pool_size"));
        }
        if self.max_open_files == 0 {
            return Err(ConfigError::InvalidValue("max_open_files"));
        }
        Ok(())
    }

    /// Assemble a buffer manager over a fresh disk manager
    pub fn build(&self) -> BufferManager {
        let disk_manager = DiskManager::with_max_files(self.max_open_files);
        BufferManager::with_capacity(disk_manager, self.buffer_pool_size)
    }
}
