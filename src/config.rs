use crate::constants::*;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "autos.toml";

/// Settings for every stage. Pure data: building one never touches the
/// dataset, loading it is a separate step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub scraper: ScraperConfig,
    pub ingestion: IngestionConfig,
    pub features: FeatureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub input_file: PathBuf,
    pub data_path: PathBuf,
    pub report_path: PathBuf,
    pub search_url: String,
    pub search_param: String,
    pub container_selector: String,
    pub value_selector: String,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub show_progress: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            input_file: ["src", "Notebook", "Data", "autos.csv"].iter().collect(),
            data_path: Path::new("artifacts").join("scrapped_data.csv"),
            report_path: Path::new("artifacts").join("scrape_report.json"),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            search_param: DEFAULT_SEARCH_PARAM.to_string(),
            container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
            value_selector: DEFAULT_VALUE_SELECTOR.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            show_progress: true,
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub scraped_data_path: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub raw_data_path: PathBuf,
    pub test_size: f64,
    pub seed: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            scraped_data_path: Path::new("artifacts").join("scrapped_data.csv"),
            train_data_path: Path::new("artifacts").join("train.csv"),
            test_data_path: Path::new("artifacts").join("test.csv"),
            raw_data_path: Path::new("artifacts").join("data.csv"),
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub input_file: PathBuf,
    pub data_path: PathBuf,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("autos.csv"),
            data_path: Path::new("artifacts").join("Feature_Engineered_Data.csv"),
        }
    }
}

impl PipelineConfig {
    /// Reads `path`, else `$AUTOS_CONFIG`, else `autos.toml` when present,
    /// falling back to defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("AUTOS_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut config = match candidate {
            Some(p) => {
                let content = fs::read_to_string(&p).map_err(|e| {
                    PipelineError::Config(format!("Failed to read config file '{}': {}", p.display(), e))
                })?;
                info!("Loaded configuration from {}", p.display());
                Self::from_toml(&content)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_var("AUTOS_CONCURRENCY") {
            self.scraper.concurrency = v
                .parse()
                .map_err(|e| PipelineError::Config(format!("AUTOS_CONCURRENCY='{v}': {e}")))?;
        }
        if let Some(v) = env_var("AUTOS_REQUEST_TIMEOUT_SECS") {
            self.scraper.request_timeout_secs = v
                .parse()
                .map_err(|e| PipelineError::Config(format!("AUTOS_REQUEST_TIMEOUT_SECS='{v}': {e}")))?;
        }
        if let Some(v) = env_var("AUTOS_INPUT_FILE") {
            self.scraper.input_file = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scraper.concurrency == 0 {
            return Err(PipelineError::Config("scraper.concurrency must be at least 1".into()));
        }
        if self.scraper.request_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "scraper.request_timeout_secs must be positive".into(),
            ));
        }
        let t = self.ingestion.test_size;
        if !(t > 0.0 && t < 1.0) {
            return Err(PipelineError::Config(format!(
                "ingestion.test_size must be between 0 and 1, got {t}"
            )));
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_artifact_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.scraper.concurrency, 10);
        assert_eq!(config.scraper.data_path, Path::new("artifacts/scrapped_data.csv"));
        assert_eq!(config.ingestion.raw_data_path, Path::new("artifacts/data.csv"));
        assert_eq!(
            config.features.data_path,
            Path::new("artifacts/Feature_Engineered_Data.csv")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [scraper]
            concurrency = 4

            [ingestion]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.scraper.concurrency, 4);
        assert_eq!(config.scraper.search_param, "search");
        assert_eq!(config.ingestion.seed, 7);
        assert_eq!(config.ingestion.test_size, 0.2);
    }

    #[test]
    fn example_file_matches_defaults() {
        let config = PipelineConfig::from_toml(include_str!("../autos.example.toml")).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.scraper.input_file, defaults.scraper.input_file);
        assert_eq!(config.scraper.concurrency, defaults.scraper.concurrency);
        assert_eq!(config.ingestion.seed, defaults.ingestion.seed);
        assert_eq!(config.features.data_path, defaults.features.data_path);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = PipelineConfig::default();
        config.scraper.concurrency = 0;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }
}
