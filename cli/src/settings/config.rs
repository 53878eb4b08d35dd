use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::settings::config_model::SettingsConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to deserialize config.")]
    Serde(#[from] serde_yaml::Error),
    #[error("Failed to open config file")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<SettingsConfig, ConfigError> {
    info!("Loading {}", path.as_ref().to_string_lossy());
    let mut file = File::open(path)?;
    let mut s = String::new();
    file.read_to_string(&mut s)?;
    let settings: SettingsConfig = serde_yaml::from_str(&s)?;

    settings.validate().map_err(ConfigError::Invalid)?;

    Ok(settings)
}
