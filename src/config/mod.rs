use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::logging::LoggingConfig;

const WORKING_SIZE_RANGE: std::ops::RangeInclusive<u32> = 16..=2048;
const MAX_SIGMA: f32 = 10.0;
const MAX_UPLOAD_SIZE_MB: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub analyzer: AnalyzerConfig,
    pub extractor: ExtractorConfig,
    pub image: ImageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Normalized offset magnitude at or below which a shot counts as aligned
    pub deadband: f32,
    /// Time budget for extracting one landmark, detector start-up included
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorBackend {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExtractorConfig {
    pub backend: ExtractorBackend,
    pub local: LocalExtractorConfig,
    pub remote: RemoteExtractorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalExtractorConfig {
    pub working_size: u32,
    pub smoothing_sigma: f32,
    pub threshold_sigma: f32,
    /// Minimum luminance standard deviation (0-255 scale) for a usable image
    pub min_contrast: f32,
    pub min_foreground_fraction: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteExtractorConfig {
    pub endpoint: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub min_size: u32,
    pub max_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_size_mb: usize,
    pub enable_cors: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            deadband: 0.03,
            timeout_ms: 5000,
        }
    }
}

impl Default for LocalExtractorConfig {
    fn default() -> Self {
        Self {
            working_size: 128,
            smoothing_sigma: 1.5,
            threshold_sigma: 1.0,
            min_contrast: 4.0,
            min_foreground_fraction: 0.002,
        }
    }
}

impl LocalExtractorConfig {
    /// Every field must be finite and inside its working range.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let within = |v: f32, lo: f32, hi: f32| v.is_finite() && v >= lo && v <= hi;

        if !WORKING_SIZE_RANGE.contains(&self.working_size) {
            errors.push(format!(
                "Local extractor working_size must be in [{}, {}]",
                WORKING_SIZE_RANGE.start(),
                WORKING_SIZE_RANGE.end()
            ));
        }

        if !within(self.smoothing_sigma, 0.0, MAX_SIGMA) {
            errors.push(format!(
                "Local extractor smoothing_sigma must be in [0, {MAX_SIGMA}]"
            ));
        }

        if !within(self.threshold_sigma, 0.0, MAX_SIGMA) {
            errors.push(format!(
                "Local extractor threshold_sigma must be in [0, {MAX_SIGMA}]"
            ));
        }

        if !within(self.min_contrast, 0.0, 255.0) {
            errors.push("Local extractor min_contrast must be in [0, 255]".to_string());
        }

        if !(self.min_foreground_fraction.is_finite()
            && (0.0..1.0).contains(&self.min_foreground_fraction))
        {
            errors.push("Local extractor min_foreground_fraction must be in [0, 1)".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for RemoteExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000".to_string(),
            request_timeout_ms: 4000,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            min_size: 8,
            max_size: 10000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            max_upload_size_mb: 10,
            enable_cors: true,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> anyhow::Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.analyzer.deadband.is_finite() && self.analyzer.deadband > 0.0) {
            errors.push("Analyzer deadband must be a positive number".to_string());
        }

        if self.analyzer.deadband >= 1.0 {
            errors.push("Analyzer deadband must be below 1.0 (normalized extent)".to_string());
        }

        if self.analyzer.timeout_ms == 0 {
            errors.push("Analyzer timeout_ms must be positive".to_string());
        }

        if let Err(local_errors) = self.extractor.local.validate() {
            errors.extend(local_errors);
        }

        if self.extractor.backend == ExtractorBackend::Remote
            && !(self.extractor.remote.endpoint.starts_with("http://")
                || self.extractor.remote.endpoint.starts_with("https://"))
        {
            errors.push("Remote extractor endpoint must be an http(s) URL".to_string());
        }

        if self.image.min_size >= self.image.max_size {
            errors.push("Image min_size must be less than max_size".to_string());
        }

        if !(1..=MAX_UPLOAD_SIZE_MB).contains(&self.server.max_upload_size_mb) {
            errors.push(format!(
                "Server max_upload_size_mb must be in [1, {MAX_UPLOAD_SIZE_MB}]"
            ));
        }

        if self.server.port == 0 {
            errors.push("Server port must be valid".to_string());
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// Load a config file, falling back to defaults.
///
/// Runs before the subscriber is installed, so problems go to stderr.
pub fn load_config_or_default(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    eprintln!("Configuration validation errors:");
                    for error in errors {
                        eprintln!("  - {}", error);
                    }
                    eprintln!("Using default configuration instead.");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                eprintln!("Failed to load config from '{}': {:#}", path.display(), e);
                eprintln!("Using default configuration.");
                Config::default()
            }
        },
        None => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analyzer.deadband, 0.03);
        assert_eq!(config.analyzer.timeout_ms, 5000);
        assert_eq!(config.extractor.backend, ExtractorBackend::Local);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [analyzer]
            deadband = 0.05

            [extractor]
            backend = "remote"
            "#,
        )
        .unwrap();

        assert_eq!(config.analyzer.deadband, 0.05);
        assert_eq!(config.analyzer.timeout_ms, 5000);
        assert_eq!(config.extractor.backend, ExtractorBackend::Remote);
        assert_eq!(config.extractor.remote.endpoint, "http://127.0.0.1:5000");
        assert_eq!(config.extractor.local.working_size, 128);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.analyzer.deadband = 0.0;
        config.analyzer.timeout_ms = 0;
        config.image.min_size = 20_000;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_remote_endpoint_must_be_http() {
        let mut config = Config::default();
        config.extractor.backend = ExtractorBackend::Remote;
        config.extractor.remote.endpoint = "ftp://somewhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_extractor_parameters_rejected() {
        let config: Config = toml::from_str(
            "[extractor.local]\nsmoothing_sigma = nan\nthreshold_sigma = nan\n",
        )
        .unwrap();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("smoothing_sigma")));
        assert!(errors.iter().any(|e| e.contains("threshold_sigma")));
    }

    fn assert_rejects(field: &str, mutate: impl Fn(&mut LocalExtractorConfig)) {
        let mut local = LocalExtractorConfig::default();
        mutate(&mut local);
        let errors = local.validate().unwrap_err();
        assert_eq!(errors.len(), 1, "{field}: {errors:?}");
        assert!(errors[0].contains(field), "{field}: {errors:?}");
    }

    #[test]
    fn test_extractor_parameter_bounds() {
        assert!(LocalExtractorConfig::default().validate().is_ok());

        assert_rejects("working_size", |c| c.working_size = 8);
        assert_rejects("working_size", |c| c.working_size = 100_000);
        assert_rejects("smoothing_sigma", |c| c.smoothing_sigma = -1.0);
        assert_rejects("smoothing_sigma", |c| c.smoothing_sigma = 1.0e6);
        assert_rejects("threshold_sigma", |c| c.threshold_sigma = f32::INFINITY);
        assert_rejects("min_contrast", |c| c.min_contrast = f32::NAN);
        assert_rejects("min_contrast", |c| c.min_contrast = 300.0);
        assert_rejects("min_foreground_fraction", |c| c.min_foreground_fraction = f32::NAN);
        assert_rejects("min_foreground_fraction", |c| c.min_foreground_fraction = 1.0);
    }

    #[test]
    fn test_upload_limit_bounded() {
        let mut config = Config::default();
        config.server.max_upload_size_mb = 0;
        assert!(config.validate().is_err());

        config.server.max_upload_size_mb = usize::MAX;
        let errors = config.validate().unwrap_err();
        assert!(errors[0].contains("max_upload_size_mb"));
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.analyzer.deadband = 0.04;

        let toml_path = dir.path().join("align.toml");
        config.save_to_file(&toml_path, ConfigFormat::Toml).unwrap();
        let loaded = Config::load_from_file(&toml_path).unwrap();
        assert_eq!(loaded.analyzer.deadband, 0.04);

        let json_path = dir.path().join("align.json");
        config.save_to_file(&json_path, ConfigFormat::Json).unwrap();
        let loaded = Config::load_from_file(&json_path).unwrap();
        assert_eq!(loaded.analyzer.deadband, 0.04);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[analyzer]\ndeadband = -1.0\n").unwrap();

        let config = load_config_or_default(Some(&path));
        assert_eq!(config.analyzer.deadband, 0.03);
    }
}
