//! Startup configuration from environment variables and an optional JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chunk_source_mastra::MastraSourceConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::render::RenderMode;

pub const SOURCE_ENV_VAR: &str = "CHAT_CLIENT_SOURCE";
pub const CONFIG_PATH_ENV_VAR: &str = "CHAT_CLIENT_CONFIG_PATH";
pub const BASE_URL_ENV_VAR: &str = "MASTRA_API_URL";

pub const DEFAULT_SOURCE_ID: &str = "mock";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'timeout_sec' in {path} must be > 0")]
    InvalidTimeout { path: PathBuf },

    #[error("'{field}' in {path} must not be empty")]
    EmptyField { path: PathBuf, field: &'static str },
}

/// On-disk shape of `CHAT_CLIENT_CONFIG_PATH`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub agent_id: Option<String>,
    pub thread_id: Option<String>,
    pub resource_id: Option<String>,
    pub api_key: Option<String>,
    pub timeout_sec: Option<u64>,
    pub render: Option<RenderMode>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.timeout_sec == Some(0) {
            return Err(ConfigError::InvalidTimeout {
                path: path.to_path_buf(),
            });
        }

        let required = [
            ("agent_id", &self.agent_id),
            ("thread_id", &self.thread_id),
            ("resource_id", &self.resource_id),
        ];
        for (field, value) in required {
            if value.as_deref().is_some_and(|value| value.trim().is_empty()) {
                return Err(ConfigError::EmptyField {
                    path: path.to_path_buf(),
                    field,
                });
            }
        }

        Ok(())
    }
}

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub source_id: String,
    pub mastra: MastraSourceConfig,
    pub render: RenderMode,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = env_string_opt(CONFIG_PATH_ENV_VAR).map(PathBuf::from);
        let file = match config_path {
            Some(path) => FileConfig::load(&path)?,
            None => FileConfig::default(),
        };

        Ok(Self::resolve(
            env_string_opt(SOURCE_ENV_VAR),
            file,
            env_string_opt(BASE_URL_ENV_VAR),
        ))
    }

    /// Merges the file settings with the environment. `base_url_override`
    /// wins over the file's `base_url`.
    pub fn resolve(
        source_id: Option<String>,
        file: FileConfig,
        base_url_override: Option<String>,
    ) -> Self {
        let mut mastra = MastraSourceConfig::default();

        if let Some(agent_id) = file.agent_id {
            mastra.agent_id = agent_id.trim().to_string();
        }
        if let Some(thread_id) = file.thread_id {
            mastra.thread_id = thread_id;
        }
        if let Some(resource_id) = file.resource_id {
            mastra.resource_id = resource_id;
        }
        if let Some(base_url) = base_url_override.or(file.base_url) {
            mastra = mastra.with_base_url(base_url);
        }
        if let Some(api_key) = file.api_key.filter(|key| !key.trim().is_empty()) {
            mastra = mastra.with_api_key(api_key);
        }
        if let Some(timeout_sec) = file.timeout_sec {
            mastra = mastra.with_timeout(Duration::from_secs(timeout_sec));
        }

        Self {
            source_id: source_id
                .map(|value| value.trim().to_ascii_lowercase())
                .unwrap_or_else(|| DEFAULT_SOURCE_ID.to_string()),
            mastra,
            render: file.render.unwrap_or_default(),
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
