//! Logging configuration
//!
//! Output destinations, verbosity and metric collection for the analyzer
//! and the detection service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level for this crate (trace, debug, info, warn, error)
    pub level: String,

    /// Enable console output
    pub console_output: bool,

    /// Emit console output as JSON lines instead of human-readable text
    pub json_console: bool,

    /// Directory for rolling JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// Include file location in logs
    pub include_file_location: bool,

    /// Keep per-operation latency measurements in memory
    pub collect_metrics: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            json_console: false,
            log_directory: None,
            include_file_location: false,
            collect_metrics: true,
        }
    }
}

impl LoggingConfig {
    /// Verbose console logging plus a local `logs/` directory
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            console_output: true,
            json_console: false,
            log_directory: Some(PathBuf::from("logs")),
            include_file_location: true,
            collect_metrics: true,
        }
    }

    /// JSON console output at warn level, no file logging
    pub fn production() -> Self {
        Self {
            level: "warn".to_string(),
            console_output: true,
            json_console: true,
            log_directory: None,
            include_file_location: false,
            collect_metrics: true,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !VALID_LEVELS.contains(&self.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.level, VALID_LEVELS
            ));
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Level to use after applying `-v` flags from the command line
    pub fn level_with_verbosity(&self, verbose: u8) -> &str {
        match verbose {
            0 => &self.level,
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_output);
        assert!(config.log_directory.is_none());
        assert!(config.collect_metrics);
    }

    #[test]
    fn test_presets() {
        assert_eq!(LoggingConfig::development().level, "debug");
        let production = LoggingConfig::production();
        assert_eq!(production.level, "warn");
        assert!(production.json_console);
    }

    #[test]
    fn test_level_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verbosity_overrides_level() {
        let config = LoggingConfig::default();
        assert_eq!(config.level_with_verbosity(0), "info");
        assert_eq!(config.level_with_verbosity(1), "debug");
        assert_eq!(config.level_with_verbosity(4), "trace");
    }
}
