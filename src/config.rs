//! Configuration
//!
//! Loads configuration from TOML file at `~/.config/strata/config.toml`.
//! Auto-generates default config file on first run if missing. Holds the
//! fixed group set and an optional control-socket path override.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Group names, in screen-assignment order. The set is fixed for the
    /// daemon's lifetime and must have at least as many entries as there
    /// are screens.
    pub groups: Vec<String>,

    /// Control-socket path; `$XDG_RUNTIME_DIR/strata.sock` when unset.
    pub socket: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groups: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            socket: None,
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Resolve the control-socket path: CLI flag first, then the config
    /// key, then the runtime-dir default.
    pub fn socket_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.socket.clone())
            .unwrap_or_else(crate::ipc::protocol::default_socket_path)
    }

    fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            bail!("config declares no groups");
        }
        for (i, name) in self.groups.iter().enumerate() {
            if name.is_empty() {
                bail!("config contains an empty group name");
            }
            if self.groups[..i].contains(name) {
                bail!("duplicate group name '{}' in config", name);
            }
        }
        Ok(())
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("strata");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = Self::default();
        let toml_string =
            toml::to_string_pretty(&default_config).context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}
