pub mod cli;

#[cfg(feature = "cli")]
pub mod args;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "gorse-etl.toml";

/// Top-level configuration, normally read from `gorse-etl.toml`.
/// Every section is optional and falls back to the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gorse: GorseConfig,
    pub extract: ExtractConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the Gorse REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GorseConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
}

impl Default for GorseConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8088/api".to_string(),
            api_key: "gorse_key".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl GorseConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Dashboard lives one level above the `/api` prefix.
    pub fn dashboard_url(&self) -> &str {
        self.base_url
            .trim_end_matches('/')
            .trim_end_matches("/api")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub input_csv: String,
    pub output_dir: String,
    /// Leading feedback rows copied into `test_sample.csv`.
    pub sample_rows: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            input_csv: "realestate_data.csv".to_string(),
            output_dir: "gorse_data".to_string(),
            sample_rows: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub data_dir: String,
    pub items_file: String,
    pub feedback_file: String,
    pub item_batch_size: usize,
    pub feedback_batch_size: usize,
    pub batch_delay_ms: u64,
    pub training_wait_secs: u64,
    pub recommend_count: usize,
    pub recommend_top: usize,
    pub test_users: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            data_dir: ".".to_string(),
            items_file: "items.csv".to_string(),
            feedback_file: "feedback.csv".to_string(),
            item_batch_size: 10,
            feedback_batch_size: 20,
            batch_delay_ms: 100,
            training_wait_secs: 30,
            recommend_count: 5,
            recommend_top: 3,
            test_users: vec![
                "9b6d5856-b182-4c98-97ee-982ebc116943".to_string(),
                "cb987911-b3a0-47fd-a25c-fdf8f3c18bba".to_string(),
                "68c3b151-6662-4096-a197-233ac78d7ad5".to_string(),
                "2db80906-9b4b-4649-b648-b58b46c3c048".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn training_wait(&self) -> Duration {
        Duration::from_secs(self.training_wait_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Reads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Expands `${VAR}` references (e.g. `${GORSE_API_KEY}`) from the environment.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("gorse.base_url", &self.gorse.base_url)?;
        validation::validate_non_empty_string("gorse.api_key", &self.gorse.api_key)?;

        validation::validate_csv_file("extract.input_csv", &self.extract.input_csv)?;
        validation::validate_path("extract.output_dir", &self.extract.output_dir)?;

        validation::validate_path("upload.data_dir", &self.upload.data_dir)?;
        validation::validate_csv_file("upload.items_file", &self.upload.items_file)?;
        validation::validate_csv_file("upload.feedback_file", &self.upload.feedback_file)?;
        validation::validate_positive_number("upload.item_batch_size", self.upload.item_batch_size, 1)?;
        validation::validate_positive_number(
            "upload.feedback_batch_size",
            self.upload.feedback_batch_size,
            1,
        )?;
        validation::validate_positive_number("upload.recommend_count", self.upload.recommend_count, 1)?;

        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn input_csv(&self) -> &str {
        &self.extract.input_csv
    }

    fn output_dir(&self) -> &str {
        &self.extract.output_dir
    }

    fn sample_rows(&self) -> usize {
        self.extract.sample_rows
    }
}
