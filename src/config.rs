use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{UiPilotError, UiPilotResult};
use crate::snapshot::serializer::ContextFormat;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Recursion bound for the accessibility walk; elements at the cutoff are
    /// recorded as leaves.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Safety cap on the total number of scanned elements.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { max_depth: default_max_depth(), max_items: default_max_items() }
    }
}

fn default_max_depth() -> u32 {
    12
}

fn default_max_items() -> usize {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContextConfig {
    /// "tagged" for verbose field names, "compact" for the single-letter form.
    #[serde(default)]
    pub format: ContextFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Run validated commands without manual confirmation.
    #[serde(default)]
    pub auto_execute: bool,
    /// Bounded wait for a window to become responsive before Window-pattern
    /// actions act on it.
    #[serde(default = "default_window_wait_ms")]
    pub window_wait_ms: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { auto_execute: false, window_wait_ms: default_window_wait_ms() }
    }
}

fn default_window_wait_ms() -> u32 {
    5000
}

fn resolve_config_path() -> UiPilotResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(UiPilotError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> UiPilotResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), max_depth = config.scan.max_depth, "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> UiPilotResult<()> {
    let path = resolve_config_path()?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
