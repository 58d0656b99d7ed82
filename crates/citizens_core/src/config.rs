//! Process configuration from environment variables.
//!
//! # Responsibility
//! - Resolve database location and logging settings at startup.
//! - Normalize and validate raw values before they reach other modules.
//!
//! # Invariants
//! - `AppConfig` values are always normalized (known level, absolute dir).
//! - Parsing reads through an injectable lookup so tests avoid process env.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_PATH_VAR: &str = "CITIZENS_DB_PATH";
pub const LOG_DIR_VAR: &str = "CITIZENS_LOG_DIR";
pub const LOG_LEVEL_VAR: &str = "CITIZENS_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidValue { var: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar(var) => write!(f, "environment variable `{var}` is not set"),
            Self::InvalidValue { var, message } => write!(f, "invalid `{var}`: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// File logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: &'static str,
    /// Absolute directory for rolling log files.
    pub dir: PathBuf,
}

impl LogConfig {
    /// Builds normalized logging settings from raw text values.
    pub fn new(level: &str, dir: &str) -> Result<Self, ConfigError> {
        let level = normalize_level(level).map_err(|message| ConfigError::InvalidValue {
            var: LOG_LEVEL_VAR,
            message,
        })?;
        let dir = normalize_log_dir(dir).map_err(|message| ConfigError::InvalidValue {
            var: LOG_DIR_VAR,
            message,
        })?;
        Ok(Self { level, dir })
    }
}

/// Startup configuration for core callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// `None` keeps file logging disabled.
    pub log: Option<LogConfig>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup` (variable name → raw value).
    ///
    /// # Errors
    /// - `MissingVar` when `CITIZENS_DB_PATH` is unset or blank.
    /// - `InvalidValue` for unknown log levels or relative log directories.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup(DB_PATH_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingVar(DB_PATH_VAR))?;

        let log = match lookup(LOG_DIR_VAR) {
            Some(dir) => {
                let level =
                    lookup(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string());
                Some(LogConfig::new(&level, &dir)?)
            }
            None => None,
        };

        Ok(Self {
            db_path: PathBuf::from(db_path),
            log,
        })
    }
}

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!("log dir must be an absolute path, got `{trimmed}`"));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_level, AppConfig, ConfigError, LogConfig, DB_PATH_VAR, LOG_DIR_VAR,
        LOG_LEVEL_VAR,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn absolute_dir() -> String {
        std::env::temp_dir()
            .join("citizens-logs")
            .to_str()
            .expect("temp dir should be valid UTF-8")
            .to_string()
    }

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn db_path_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar(DB_PATH_VAR));

        let err = AppConfig::from_lookup(lookup(&[(DB_PATH_VAR, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar(DB_PATH_VAR));
    }

    #[test]
    fn logging_is_disabled_without_dir() {
        let config =
            AppConfig::from_lookup(lookup(&[(DB_PATH_VAR, "citizens.sqlite3")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("citizens.sqlite3"));
        assert!(config.log.is_none());
    }

    #[test]
    fn logging_settings_are_normalized() {
        let dir = absolute_dir();
        let config = AppConfig::from_lookup(lookup(&[
            (DB_PATH_VAR, "citizens.sqlite3"),
            (LOG_DIR_VAR, dir.as_str()),
            (LOG_LEVEL_VAR, "WARNING"),
        ]))
        .unwrap();

        let log = config.log.unwrap();
        assert_eq!(log.level, "warn");
        assert_eq!(log.dir, PathBuf::from(dir));
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = LogConfig::new("info", "logs/dev").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == LOG_DIR_VAR));
    }
}
