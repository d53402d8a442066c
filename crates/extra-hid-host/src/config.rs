use std::path::{Path, PathBuf};

use extra_hid_core::config::DeviceConfig;
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("extrahid").join("device.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("extrahid").join("device.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("extrahid")
            .join("device.toml");
    }

    PathBuf::from("device.toml")
}

/// Load the device config, falling back to defaults if the file is missing or
/// does not parse.
pub fn load_from_file(path: &Path) -> DeviceConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return DeviceConfig::default(),
    };

    match toml::from_str::<DeviceConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse device config {}: {e}; using defaults",
                path.display()
            );
            DeviceConfig::default()
        }
    }
}

pub fn save_to_file(path: &Path, cfg: &DeviceConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(cfg)?;
    std::fs::write(path, text)?;
    info!("Saved device config to {}", path.display());
    Ok(())
}
