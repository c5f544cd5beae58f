use std::path::PathBuf;

use thiserror::Error;

/// Typed failures of the pipeline stages.
///
/// Parse problems inside individual cells are never reported here: they
/// degrade to [`Value::Null`](crate::data::model::Value::Null) and are
/// imputed later.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{context}; available columns: {available:?}")]
    Schema {
        context: String,
        available: Vec<String>,
    },

    #[error(
        "Kaggle API credentials not found at {0}. Create a token under \
         'Account' → 'API' → 'Create New Token' on kaggle.com and place kaggle.json there"
    )]
    MissingCredentials(PathBuf),

    #[error("download failed: {0}")]
    Download(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("feature columns {found:?} do not match the model's {expected:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl PipelineError {
    pub fn schema(context: impl Into<String>, available: &[String]) -> Self {
        PipelineError::Schema {
            context: context.into(),
            available: available.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
