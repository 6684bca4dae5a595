//! Spool configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `SPOOLQ_*` environment variables. The CLI applies its own flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::scheduler::spool::{sibling_dir, Spool};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or file field has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// The YAML configuration file could not be parsed.
    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for one spool server.
#[derive(Debug, Clone, PartialEq)]
pub struct SpoolConfig {
    /// Opaque handle passed to the executor factory, typically a model file
    /// or a program path.
    pub model_path: PathBuf,
    /// Extra arguments for the executor, passed through untouched.
    pub model_args: Vec<String>,
    /// Directory clients drop job files into.
    pub input_dir: PathBuf,
    /// Directory results are written to.
    pub output_dir: PathBuf,
    /// Number of worker tasks, each with its own executor.
    pub num_workers: usize,
    /// Delay between scans of the input directory.
    pub scan_interval: Duration,
    /// How often the server logs pool status.
    pub status_interval: Duration,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            model_args: Vec::new(),
            input_dir: PathBuf::from("data/input"),
            output_dir: PathBuf::from("data/output"),
            num_workers: 1,
            scan_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(5),
        }
    }
}

/// On-disk form of [`SpoolConfig`]. Every field is optional and only
/// overrides what is present.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    model_path: Option<PathBuf>,
    model_args: Option<Vec<String>>,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    num_workers: Option<usize>,
    scan_interval_ms: Option<u64>,
    status_interval_secs: Option<u64>,
}

impl SpoolConfig {
    /// Creates a configuration for `model_path` with default values.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SPOOLQ_MODEL_PATH`: Model handle
    /// - `SPOOLQ_INPUT_DIR`: Input directory (default: data/input)
    /// - `SPOOLQ_OUTPUT_DIR`: Output directory (default: data/output)
    /// - `SPOOLQ_NUM_WORKERS`: Number of workers (default: 1)
    /// - `SPOOLQ_SCAN_INTERVAL_MS`: Scan interval in milliseconds (default: 1000)
    /// - `SPOOLQ_STATUS_INTERVAL_SECS`: Status log interval in seconds (default: 5)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a YAML file on top of the defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_yaml_file(path)?;
        Ok(config)
    }

    /// Defaults, then `file` if given, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = file {
            config.merge_yaml_file(path)?;
        }
        config.merge_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn merge_yaml_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_file(file);
        Ok(())
    }

    fn merge_file(&mut self, file: ConfigFile) {
        if let Some(model_path) = file.model_path {
            self.model_path = model_path;
        }
        if let Some(args) = file.model_args {
            self.model_args = args;
        }
        if let Some(dir) = file.input_dir {
            self.input_dir = dir;
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = dir;
        }
        if let Some(n) = file.num_workers {
            self.num_workers = n;
        }
        if let Some(ms) = file.scan_interval_ms {
            self.scan_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = file.status_interval_secs {
            self.status_interval = Duration::from_secs(secs);
        }
    }

    fn merge_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("SPOOLQ_MODEL_PATH") {
            self.model_path = PathBuf::from(val);
        }

        if let Some(val) = lookup("SPOOLQ_INPUT_DIR") {
            self.input_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("SPOOLQ_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("SPOOLQ_NUM_WORKERS") {
            self.num_workers = parse_env_value(&val, "SPOOLQ_NUM_WORKERS")?;
        }

        if let Some(val) = lookup("SPOOLQ_SCAN_INTERVAL_MS") {
            let ms: u64 = parse_env_value(&val, "SPOOLQ_SCAN_INTERVAL_MS")?;
            self.scan_interval = Duration::from_millis(ms);
        }

        if let Some(val) = lookup("SPOOLQ_STATUS_INTERVAL_SECS") {
            let secs: u64 = parse_env_value(&val, "SPOOLQ_STATUS_INTERVAL_SECS")?;
            self.status_interval = Duration::from_secs(secs);
        }

        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::ValidationFailed(
                "num_workers must be greater than 0".to_string(),
            ));
        }

        if self.scan_interval.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "scan_interval must be greater than 0".to_string(),
            ));
        }

        if self.status_interval.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "status_interval must be greater than 0".to_string(),
            ));
        }

        if self.input_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "input_dir cannot be empty".to_string(),
            ));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "output_dir cannot be empty".to_string(),
            ));
        }

        if normalize(&self.input_dir) == normalize(&self.output_dir) {
            return Err(ConfigError::ValidationFailed(
                "input_dir and output_dir must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolves relative paths against the current working directory.
    pub fn resolve_paths(self) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()?;
        Ok(self.resolve_against(&cwd))
    }

    /// Resolves relative paths against `base`. An empty model path stays
    /// empty.
    pub fn resolve_against(mut self, base: &Path) -> Self {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        if !self.model_path.as_os_str().is_empty() {
            self.model_path = resolve(&self.model_path);
        }
        self.input_dir = resolve(&self.input_dir);
        self.output_dir = resolve(&self.output_dir);
        self
    }

    /// `<input_dir>_processing`
    pub fn processing_dir(&self) -> PathBuf {
        sibling_dir(&self.input_dir, "_processing")
    }

    /// `<input_dir>_failed`
    pub fn failed_dir(&self) -> PathBuf {
        sibling_dir(&self.input_dir, "_failed")
    }

    /// The spool described by this configuration.
    pub fn spool(&self) -> Spool {
        Spool::new(&self.input_dir, &self.output_dir)
    }

    /// Builder method to set the model handle.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Builder method to set extra executor arguments.
    pub fn with_model_args(mut self, args: Vec<String>) -> Self {
        self.model_args = args;
        self
    }

    /// Builder method to set the input directory.
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    /// Builder method to set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set the number of workers.
    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    /// Builder method to set the scan interval.
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Builder method to set the status log interval.
    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SpoolConfig::default();
        assert_eq!(config.input_dir, PathBuf::from("data/input"));
        assert_eq!(config.output_dir, PathBuf::from("data/output"));
        assert_eq!(config.num_workers, 1);
        assert_eq!(config.scan_interval, Duration::from_secs(1));
        assert_eq!(config.status_interval, Duration::from_secs(5));
        assert!(config.model_args.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = SpoolConfig::new("models/tiny.gguf")
            .with_input_dir("/srv/in")
            .with_output_dir("/srv/out")
            .with_num_workers(4)
            .with_scan_interval(Duration::from_millis(250))
            .with_status_interval(Duration::from_secs(30))
            .with_model_args(vec!["--temp".to_string(), "0".to_string()]);

        assert_eq!(config.model_path, PathBuf::from("models/tiny.gguf"));
        assert_eq!(config.input_dir, PathBuf::from("/srv/in"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.scan_interval, Duration::from_millis(250));
        assert_eq!(config.status_interval, Duration::from_secs(30));
        assert_eq!(config.model_args, vec!["--temp", "0"]);
    }

    #[test]
    fn test_derived_dirs() {
        let config = SpoolConfig::default().with_input_dir("/srv/jobs/");
        assert_eq!(config.processing_dir(), PathBuf::from("/srv/jobs_processing"));
        assert_eq!(config.failed_dir(), PathBuf::from("/srv/jobs_failed"));

        let spool = config.spool();
        assert_eq!(spool.processing_dir(), config.processing_dir().as_path());
        assert_eq!(spool.failed_dir(), config.failed_dir().as_path());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(SpoolConfig::new("model").validate().is_ok());
    }

    #[test]
    fn test_validation_zero_workers() {
        let err = SpoolConfig::new("model")
            .with_num_workers(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("num_workers"));
    }

    #[test]
    fn test_validation_zero_scan_interval() {
        let err = SpoolConfig::new("model")
            .with_scan_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("scan_interval"));
    }

    #[test]
    fn test_validation_empty_dirs() {
        let err = SpoolConfig::new("model")
            .with_input_dir("")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("input_dir"));

        let err = SpoolConfig::new("model")
            .with_output_dir("")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn test_validation_same_dirs() {
        let err = SpoolConfig::new("model")
            .with_input_dir("data/jobs")
            .with_output_dir("data/jobs/")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_merge_env() {
        let mut config = SpoolConfig::default();
        config
            .merge_env(env(&[
                ("SPOOLQ_MODEL_PATH", "/models/a.bin"),
                ("SPOOLQ_INPUT_DIR", "/q/in"),
                ("SPOOLQ_OUTPUT_DIR", "/q/out"),
                ("SPOOLQ_NUM_WORKERS", "3"),
                ("SPOOLQ_SCAN_INTERVAL_MS", "200"),
                ("SPOOLQ_STATUS_INTERVAL_SECS", "60"),
            ]))
            .unwrap();

        assert_eq!(config.model_path, PathBuf::from("/models/a.bin"));
        assert_eq!(config.input_dir, PathBuf::from("/q/in"));
        assert_eq!(config.output_dir, PathBuf::from("/q/out"));
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.scan_interval, Duration::from_millis(200));
        assert_eq!(config.status_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_merge_env_invalid_number() {
        let mut config = SpoolConfig::default();
        let err = config
            .merge_env(env(&[("SPOOLQ_NUM_WORKERS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SPOOLQ_NUM_WORKERS"));
    }

    #[test]
    fn test_from_yaml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("spoolq.yaml");
        std::fs::write(
            &path,
            "model_path: /models/tiny.gguf\nnum_workers: 2\nscan_interval_ms: 50\nmodel_args: [\"-n\", \"64\"]\n",
        )
        .unwrap();

        let config = SpoolConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.model_path, PathBuf::from("/models/tiny.gguf"));
        assert_eq!(config.num_workers, 2);
        assert_eq!(config.scan_interval, Duration::from_millis(50));
        assert_eq!(config.model_args, vec!["-n", "64"]);
        // Untouched fields keep their defaults.
        assert_eq!(config.input_dir, PathBuf::from("data/input"));
    }

    #[test]
    fn test_from_yaml_file_rejects_unknown_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("spoolq.yaml");
        std::fs::write(&path, "workers: 2\n").unwrap();

        let err = SpoolConfig::from_yaml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_yaml_file_missing() {
        let temp = TempDir::new().unwrap();
        let err = SpoolConfig::from_yaml_file(&temp.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_resolve_against() {
        let config = SpoolConfig::new("model.bin")
            .with_input_dir("in")
            .with_output_dir("/abs/out")
            .resolve_against(Path::new("/work"));

        assert_eq!(config.model_path, PathBuf::from("/work/model.bin"));
        assert_eq!(config.input_dir, PathBuf::from("/work/in"));
        assert_eq!(config.output_dir, PathBuf::from("/abs/out"));
    }
}
