use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.yaml";
const APP_DIR: &str = "security-filter-hook";

pub const DEFAULT_FILTER_COMMAND: &str = "opencode-security-filter";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Raw configuration structure (as parsed from YAML)
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HookConfigRaw {
    /// Filter executable, looked up on PATH unless absolute
    filter_command: Option<String>,
    /// Seconds to wait for each filter check
    timeout_secs: Option<u64>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    pub filter_command: String,
    pub timeout: Duration,
}

impl Default for HookConfig {
    fn default() -> Self {
        HookConfig {
            filter_command: DEFAULT_FILTER_COMMAND.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Get the expected config path under XDG config
pub fn get_config_path() -> PathBuf {
    let xdg_config = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });

    xdg_config.join(APP_DIR).join(CONFIG_FILENAME)
}

/// Loads and validates a config file, filling in defaults for absent keys.
pub fn load_config(config_path: &Path) -> Result<HookConfig> {
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

    // An empty YAML document parses as null rather than an empty map
    let parsed: HookConfigRaw = if content.trim().is_empty() {
        HookConfigRaw::default()
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", config_path.display()))?
    };

    let filter_command = parsed
        .filter_command
        .unwrap_or_else(|| DEFAULT_FILTER_COMMAND.to_string());
    if filter_command.trim().is_empty() {
        bail!(
            "Invalid config at {}: 'filter_command' must not be empty",
            config_path.display()
        );
    }

    let timeout_secs = parsed.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        bail!(
            "Invalid config at {}: 'timeout_secs' must be greater than zero",
            config_path.display()
        );
    }

    Ok(HookConfig {
        filter_command,
        timeout: Duration::from_secs(timeout_secs),
    })
}

/// Load config from `config_path`, never failing: a missing file means
/// defaults, and a broken one is logged and replaced by defaults.
pub fn load_or_default(config_path: &Path) -> HookConfig {
    if !config_path.exists() {
        return HookConfig::default();
    }

    match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = ?e, "ignoring invalid hook config");
            HookConfig::default()
        }
    }
}
