// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, time::Duration};

use super::ConfigError;

pub const DEFAULT_LLM_CONFIG_PATH: &str = "config/llm.json";
pub const ENV_LLM_CONFIG_PATH: &str = "LLM_CONFIG_PATH";

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    /// "gemini" (case-insensitive)
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GOOGLE_API_KEY
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg: LlmConfig =
            serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        cfg.provider = cfg.provider.trim().to_lowercase();

        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "gemini" => env::var("GOOGLE_API_KEY")
                    .map_err(|_| ConfigError::MissingVar("GOOGLE_API_KEY"))?,
                other => return Err(ConfigError::Invalid(format!("unsupported LLM provider: {other}"))),
            };
        }

        if cfg.enabled && cfg.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("LLM enabled but api_key is empty".into()));
        }
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }

        Ok(cfg)
    }

    /// Path from `LLM_CONFIG_PATH`, else `config/llm.json`.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = env::var(ENV_LLM_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_LLM_CONFIG_PATH.into());
        Self::load_from_file(path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
