//! Runtime configuration, read from the environment.

use log::LevelFilter;
use std::path::PathBuf;

pub const DATA_DIR_VAR: &str = "SPACED_OUT_DATA_DIR";
pub const LOG_LEVEL_VAR: &str = "SPACED_OUT_LOG";

const APP_DIR: &str = "spaced-out";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine a data directory, set {0}")]
    NoDataDir(&'static str),

    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

pub fn parse_log_level(level: &str) -> Result<LevelFilter, ConfigError> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| ConfigError::InvalidValue(LOG_LEVEL_VAR.to_string(), format!("'{}' is not a valid log level", level)))
}

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup(DATA_DIR_VAR) {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => Self::default_data_dir().ok_or(ConfigError::NoDataDir(DATA_DIR_VAR))?,
        };

        let log_level = match lookup(LOG_LEVEL_VAR) {
            Some(level) => parse_log_level(&level)?,
            None => LevelFilter::Info,
        };

        Ok(Config { data_dir, log_level })
    }

    /// Platform data directory, e.g. `~/.local/share/spaced-out`.
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR))
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn with_log_level(mut self, log_level: Option<LevelFilter>) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }

    /// Installs the global logger. `RUST_LOG` still refines individual modules.
    pub fn init_logging(&self) {
        let result = env_logger::Builder::new()
            .filter_level(self.log_level)
            .parse_default_env()
            .try_init();

        if result.is_err() {
            log::debug!("Logger already initialized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_lookup(lookup_from(&[(DATA_DIR_VAR, "/tmp/cards"), (LOG_LEVEL_VAR, "debug")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/cards"));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_log_level() {
        let result = Config::from_lookup(lookup_from(&[(DATA_DIR_VAR, "/tmp/cards"), (LOG_LEVEL_VAR, "loud")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(var, _)) if var == LOG_LEVEL_VAR));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[(DATA_DIR_VAR, "/tmp/cards")]))
            .unwrap()
            .with_data_dir(Some(PathBuf::from("/tmp/other")))
            .with_log_level(None);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/other"));
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level(" WARN ").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_log_level("off").unwrap(), LevelFilter::Off);
        assert!(parse_log_level("").is_err());
    }
}
