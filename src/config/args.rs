use super::{AppConfig, DEFAULT_CONFIG_FILE};
use clap::Parser;

/// Arguments of `process_data`. Every flag is optional.
#[derive(Debug, Clone, Parser)]
#[command(name = "process_data")]
#[command(about = "Normalize a raw real-estate event export into Gorse CSV files")]
pub struct ExtractArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Raw event CSV (overrides extract.input_csv)
    #[arg(long)]
    pub input: Option<String>,

    /// Output directory (overrides extract.output_dir)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log CPU and memory usage per phase
    #[arg(long)]
    pub monitor: bool,
}

impl ExtractArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.extract.input_csv = input.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.extract.output_dir = output_dir.clone();
        }
    }
}

/// Arguments shared by `upload_data` and `upload_complete`.
#[derive(Debug, Clone, Parser)]
pub struct UploadArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Directory holding items.csv and feedback.csv (overrides upload.data_dir)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Gorse API base URL (overrides gorse.base_url)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl UploadArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(data_dir) = &self.data_dir {
            config.upload.data_dir = data_dir.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.gorse.base_url = base_url.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keeps_config() {
        let args = ExtractArgs::parse_from(["process_data"]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(args.config, DEFAULT_CONFIG_FILE);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args = UploadArgs::parse_from([
            "upload_data",
            "--data-dir",
            "gorse_data",
            "--base-url",
            "http://gorse:8088/api",
        ]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.upload.data_dir, "gorse_data");
        assert_eq!(config.gorse.base_url, "http://gorse:8088/api");
    }
}
