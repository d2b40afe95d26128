//! CLI configuration
use encore_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoreConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

/// Timing of the simulated engine
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Real time between two position reports
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Media time that passes per real millisecond
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Length given to local entries without a known length
    #[serde(default = "default_entry_length_ms")]
    pub entry_length_ms: i64,
}

impl EncoreConfig {
    /// Load `encore.toml` (or `path`), then `ENCORE__*` environment overrides
    ///
    /// Nested keys use a double underscore: `ENCORE__PLAYBACK__SHUFFLE_SEED=7`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from("encore.toml"), Path::to_path_buf);
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(ConfigError::Invalid(format!(
                "config file {} does not exist",
                config_path.display()
            )));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("ENCORE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.is_empty() {
            return Err(ConfigError::Invalid("storage.database_url is empty".into()));
        }
        if self.simulation.tick_ms == 0 {
            return Err(ConfigError::Invalid("simulation.tick_ms must be positive".into()));
        }
        if !(self.simulation.speed.is_finite() && self.simulation.speed > 0.0) {
            return Err(ConfigError::Invalid("simulation.speed must be positive".into()));
        }
        if self.playback.time_coalesce_ms < 0 || self.playback.save_interval_ms <= 0 {
            return Err(ConfigError::Invalid(
                "playback intervals must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EncoreConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            playback: PlaybackConfig::default(),
            simulation: default_simulation(),
        }
    }
}

// Default value functions

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://encore.db".to_string()
}

fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        tick_ms: default_tick_ms(),
        speed: default_speed(),
        entry_length_ms: default_entry_length_ms(),
    }
}

fn default_tick_ms() -> u64 {
    250
}

fn default_speed() -> f32 {
    1.0
}

fn default_entry_length_ms() -> i64 {
    180_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EncoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.database_url, "sqlite://encore.db");
        assert_eq!(config.playback.time_coalesce_ms, 950);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: EncoreConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[playback]\nshuffle_seed = 7\n\n[simulation]\nspeed = 20.0\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.playback.shuffle_seed, Some(7));
        assert_eq!(config.playback.previous_restart_ms, 5000);
        assert_eq!(config.simulation.speed, 20.0);
        assert_eq!(config.simulation.tick_ms, 250);
    }

    #[test]
    fn zero_speed_is_rejected() {
        let mut config = EncoreConfig::default();
        config.simulation.speed = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = EncoreConfig::load(Some(Path::new("/nonexistent/encore.toml")));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
