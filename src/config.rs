use std::fs;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use log::info;
use serde::{Deserialize, Serialize};

use crate::download::DownloadOptions;
use crate::error::Result;
use crate::features::{FeatureOptions, DEFAULT_REFERENCE_YEAR};
use crate::merge::MergeOptions;
use crate::model::train::TrainOptions;

pub const DEFAULT_CONFIG_PATH: &str = "pipeline.toml";

/// Pipeline settings. Every field has a default, so the TOML file may be
/// absent or list only what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub merge: MergeConfig,
    pub features: FeaturesConfig,
    pub training: TrainOptions,
    pub download: DownloadOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where the raw catalogs are downloaded and looked up.
    pub download_dir: PathBuf,
    pub processed: PathBuf,
    pub sales: PathBuf,
    /// Catalog rows used as never-discounted examples.
    pub no_sales: PathBuf,
    pub no_sales_rows: usize,
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            download_dir: PathBuf::from("data/kaggle"),
            processed: PathBuf::from("data/processed/steam_kaggle_hybrid.csv"),
            sales: PathBuf::from("data/steam_dataset.csv"),
            no_sales: PathBuf::from("data/kaggle/games.csv"),
            no_sales_rows: 50,
            model: PathBuf::from("models/logreg_model.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub sale_quantile: f64,
    /// Year ages are measured from; the current year when unset.
    pub current_year: Option<i32>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            sale_quantile: 0.3,
            current_year: None,
        }
    }
}

impl MergeConfig {
    pub fn options(&self) -> MergeOptions {
        MergeOptions {
            current_year: self
                .current_year
                .unwrap_or_else(|| chrono::Local::now().year()),
            sale_quantile: self.sale_quantile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub reference_year: i32,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        FeaturesConfig {
            reference_year: DEFAULT_REFERENCE_YEAR,
        }
    }
}

impl FeaturesConfig {
    pub fn options(&self) -> FeatureOptions {
        FeatureOptions {
            reference_year: self.reference_year,
        }
    }
}

impl PipelineConfig {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(PipelineConfig::default());
        }
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [merge]
            sale_quantile = 0.25
            current_year = 2024

            [training]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.merge.sale_quantile, 0.25);
        assert_eq!(config.merge.options().current_year, 2024);
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.paths, PathsConfig::default());
        assert_eq!(config.download.kaggle_command, "kaggle");
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(&dir.path().join("pipeline.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.features.options().reference_year, 2025);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "[merge\nsale_quantile = ").unwrap();
        assert!(PipelineConfig::load(&path).is_err());
    }
}
