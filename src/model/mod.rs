/// Sale-probability model: preprocessing, stratified split, logistic
/// regression fit, evaluation and the JSON artifact.
///
/// ```text
///   Features ──► split ──► Preprocessor::fit ──► linfa-logistic
///                  │                                  │
///                  ▼                                  ▼
///              test rows ──────► evaluate ◄──── SaleModel ──► .json
/// ```
pub mod evaluate;
pub mod preprocess;
pub mod split;
pub mod train;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::features::{FeatureFrame, SaleQuery};
use preprocess::Preprocessor;

/// Decision threshold on the predicted probability.
pub const THRESHOLD: f64 = 0.5;

/// Intercept and coefficients over the preprocessed columns, oriented
/// towards `on_sale = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticParams {
    pub fn probabilities(&self, x: &Array2<f64>) -> Array1<f64> {
        let w = Array1::from_vec(self.coefficients.clone());
        x.dot(&w).mapv(|z| sigmoid(z + self.intercept))
    }

    pub fn decide(&self, x: &Array2<f64>) -> Vec<bool> {
        self.probabilities(x).iter().map(|&p| p >= THRESHOLD).collect()
    }

    fn negated(&self) -> Self {
        LogisticParams {
            intercept: -self.intercept,
            coefficients: self.coefficients.iter().map(|c| -c).collect(),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// The persisted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleModel {
    pub trained_at: String,
    pub train_rows: usize,
    pub preprocessor: Preprocessor,
    pub params: LogisticParams,
}

impl SaleModel {
    pub fn new(preprocessor: Preprocessor, params: LogisticParams, train_rows: usize) -> Self {
        SaleModel {
            trained_at: chrono::Local::now().to_rfc3339(),
            train_rows,
            preprocessor,
            params,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<SaleModel> {
        let reader = BufReader::new(File::open(path)?);
        let model: SaleModel = serde_json::from_reader(reader)?;
        if model.params.coefficients.len() != model.preprocessor.width() {
            return Err(PipelineError::Model(format!(
                "{} holds {} coefficients for {} preprocessed columns",
                path.display(),
                model.params.coefficients.len(),
                model.preprocessor.width()
            )));
        }
        Ok(model)
    }

    /// Probability of `on_sale = true` for every row. The frame's columns
    /// must match the training columns exactly and in order.
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        let x = self.preprocessor.transform(frame)?;
        Ok(self.params.probabilities(&x).to_vec())
    }

    pub fn predict(&self, frame: &FeatureFrame) -> Result<Vec<bool>> {
        let x = self.preprocessor.transform(frame)?;
        Ok(self.params.decide(&x))
    }

    pub fn predict_query(&self, query: &SaleQuery) -> Result<f64> {
        let proba = self.predict_proba(&query.to_frame())?;
        proba
            .first()
            .copied()
            .ok_or_else(|| PipelineError::Model("empty prediction".into()))
    }
}

/// `0.734` → `"73.4% chance of going on sale soon"`.
pub fn sale_message(probability: f64) -> String {
    format!("{:.1}% chance of going on sale soon", probability * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureColumns, FeatureRow};

    fn tiny_model() -> SaleModel {
        let frame = SaleQuery {
            price: 10.0,
            rating_pct: 80.0,
            age_years: 2.0,
            is_new_low: false,
        }
        .to_frame();
        let preprocessor = Preprocessor::fit(&frame);
        let width = preprocessor.width();
        SaleModel::new(
            preprocessor,
            LogisticParams {
                intercept: 1.0,
                coefficients: vec![0.0; width],
            },
            1,
        )
    }

    #[test]
    fn message_formats_percentage() {
        assert_eq!(sale_message(0.734), "73.4% chance of going on sale soon");
        assert_eq!(sale_message(1.0), "100.0% chance of going on sale soon");
    }

    #[test]
    fn probabilities_follow_sigmoid_and_negation() {
        let params = LogisticParams {
            intercept: 0.0,
            coefficients: vec![2.0],
        };
        let x = Array2::from_shape_vec((2, 1), vec![0.0, 1.0]).unwrap();
        let p = params.probabilities(&x);
        assert_eq!(p[0], 0.5);
        assert!((p[1] - sigmoid(2.0)).abs() < 1e-12);

        let q = params.negated().probabilities(&x);
        assert!((p[1] + q[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn artifact_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("logreg_model.json");
        let model = tiny_model();
        model.save(&path).unwrap();

        let loaded = SaleModel::load(&path).unwrap();
        assert_eq!(loaded, model);
        let p = loaded
            .predict_query(&SaleQuery {
                price: 99.0,
                rating_pct: 10.0,
                age_years: 9.0,
                is_new_low: true,
            })
            .unwrap();
        assert!((p - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn foreign_columns_are_rejected() {
        let model = tiny_model();
        let frame = FeatureFrame {
            columns: FeatureColumns {
                numeric: vec!["Price".into()],
                categorical: Vec::new(),
                boolean: Vec::new(),
            },
            rows: vec![FeatureRow {
                numeric: vec![1.0],
                categorical: Vec::new(),
                boolean: Vec::new(),
            }],
        };
        assert!(matches!(
            model.predict_proba(&frame),
            Err(PipelineError::FeatureMismatch { .. })
        ));
    }
}
