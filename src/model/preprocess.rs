use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::stats::median;
use crate::error::{PipelineError, Result};
use crate::features::{FeatureColumns, FeatureFrame};

/// Column transformer fitted on the training split.
///
/// Numeric columns are median-imputed then standard-scaled, categorical
/// columns are one-hot encoded (unknown categories encode as all zeros)
/// and boolean columns pass through as 0/1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub columns: FeatureColumns,
    pub medians: Vec<f64>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    /// Sorted categories seen per categorical column.
    pub categories: Vec<Vec<String>>,
}

impl Preprocessor {
    pub fn fit(frame: &FeatureFrame) -> Preprocessor {
        let n_numeric = frame.columns.numeric.len();
        let mut medians = Vec::with_capacity(n_numeric);
        let mut means = Vec::with_capacity(n_numeric);
        let mut scales = Vec::with_capacity(n_numeric);

        for j in 0..n_numeric {
            let raw: Vec<f64> = frame.rows.iter().map(|r| r.numeric[j]).collect();
            let fill = median(&raw).unwrap_or(0.0);
            let imputed: Vec<f64> = raw
                .iter()
                .map(|&v| if v.is_nan() { fill } else { v })
                .collect();
            let (mean, std) = mean_std(&imputed);
            medians.push(fill);
            means.push(mean);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        let categories = (0..frame.columns.categorical.len())
            .map(|j| {
                frame
                    .rows
                    .iter()
                    .map(|r| r.categorical[j].clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        Preprocessor {
            columns: frame.columns.clone(),
            medians,
            means,
            scales,
            categories,
        }
    }

    /// Names of the transformed matrix columns.
    pub fn output_names(&self) -> Vec<String> {
        let mut names = self.columns.numeric.clone();
        for (col, cats) in self.columns.categorical.iter().zip(&self.categories) {
            names.extend(cats.iter().map(|c| format!("{col}={c}")));
        }
        names.extend(self.columns.boolean.iter().cloned());
        names
    }

    pub fn width(&self) -> usize {
        self.columns.numeric.len()
            + self.categories.iter().map(Vec::len).sum::<usize>()
            + self.columns.boolean.len()
    }

    pub fn transform(&self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        if frame.columns != self.columns {
            return Err(PipelineError::FeatureMismatch {
                expected: self.columns.names(),
                found: frame.columns.names(),
            });
        }

        let mut x = Array2::<f64>::zeros((frame.len(), self.width()));
        for (i, row) in frame.rows.iter().enumerate() {
            let mut col = 0;
            for (j, &v) in row.numeric.iter().enumerate() {
                let v = if v.is_nan() { self.medians[j] } else { v };
                x[(i, col)] = (v - self.means[j]) / self.scales[j];
                col += 1;
            }
            for (value, cats) in row.categorical.iter().zip(&self.categories) {
                if let Ok(pos) = cats.binary_search(value) {
                    x[(i, col + pos)] = 1.0;
                }
                col += cats.len();
            }
            for &b in &row.boolean {
                x[(i, col)] = if b { 1.0 } else { 0.0 };
                col += 1;
            }
        }
        Ok(x)
    }
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
