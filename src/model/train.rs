use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use log::{debug, info};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::evaluate::Evaluation;
use super::preprocess::Preprocessor;
use super::split::stratified_split;
use super::{LogisticParams, SaleModel};
use crate::error::{PipelineError, Result};
use crate::features::Features;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub test_fraction: f64,
    pub seed: u64,
    pub max_iterations: u64,
    /// Oversample the minority class of the training split to parity.
    pub balance_classes: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            test_fraction: 0.2,
            seed: 42,
            max_iterations: 1000,
            balance_classes: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: SaleModel,
    pub evaluation: Evaluation,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Split, fit the preprocessor and classifier on the training rows and
/// evaluate on the held-out rows.
pub fn train(features: &Features, opts: &TrainOptions) -> Result<TrainOutcome> {
    if features.is_empty() {
        return Err(PipelineError::Model("no rows to train on".into()));
    }
    let (train_idx, test_idx) = stratified_split(&features.labels, opts.test_fraction, opts.seed)?;
    let train_set = features.subset(&train_idx);
    let test_set = features.subset(&test_idx);
    info!(
        "Training on {} rows ({} on sale), testing on {}",
        train_set.len(),
        train_set.positives(),
        test_set.len()
    );

    let preprocessor = Preprocessor::fit(&train_set.frame);
    debug!("Model inputs: {:?}", preprocessor.output_names());
    let fit_set = if opts.balance_classes {
        oversample(&train_set, opts.seed)
    } else {
        train_set.clone()
    };

    let x = preprocessor.transform(&fit_set.frame)?;
    let y = Array1::from_vec(fit_set.labels.clone());
    let params = fit_logistic(x, y, opts.max_iterations)?;
    let model = SaleModel::new(preprocessor, params, train_set.len());

    let predicted = model.predict(&test_set.frame)?;
    let evaluation = Evaluation::from_predictions(&test_set.labels, &predicted);

    Ok(TrainOutcome {
        model,
        evaluation,
        train_rows: train_set.len(),
        test_rows: test_set.len(),
    })
}

/// Fit a logistic regression and return its parameters oriented so that
/// the sigmoid gives the probability of `true`.
pub fn fit_logistic(x: Array2<f64>, y: Array1<bool>, max_iterations: u64) -> Result<LogisticParams> {
    let dataset = Dataset::new(x, y);
    let fitted = LogisticRegression::default()
        .max_iterations(max_iterations)
        .fit(&dataset)
        .map_err(|e| PipelineError::Model(e.to_string()))?;

    let params = LogisticParams {
        intercept: fitted.intercept(),
        coefficients: fitted.params().to_vec(),
    };

    // linfa chooses its own positive class
    let theirs = fitted.predict(dataset.records());
    let ours = params.decide(dataset.records());
    let agree = theirs.iter().zip(&ours).filter(|(a, b)| a == b).count();
    if agree * 2 < ours.len() {
        debug!("Flipping fitted parameters towards on_sale = true");
        return Ok(params.negated());
    }
    Ok(params)
}

/// Duplicate randomly drawn minority rows until both classes have the same
/// count.
fn oversample(set: &Features, seed: u64) -> Features {
    let (positive, negative): (Vec<usize>, Vec<usize>) =
        (0..set.len()).partition(|&i| set.labels[i]);
    let (minority, majority) = if positive.len() < negative.len() {
        (positive, negative)
    } else {
        (negative, positive)
    };
    let extra = majority.len() - minority.len();
    if extra == 0 || minority.is_empty() {
        return set.clone();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..set.len()).collect();
    indices.extend((0..extra).filter_map(|_| minority.choose(&mut rng).copied()));
    debug!("Oversampled {extra} minority rows");
    set.subset(&indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureColumns, FeatureFrame, FeatureRow, SaleQuery};

    /// On-sale rows have ratings 50..80, the others 70..100.
    fn overlapping(n: usize) -> Features {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let on_sale = i % 2 == 0;
            let base = if on_sale { 50.0 } else { 70.0 };
            let rating = base + (i % 7) as f64 * 5.0;
            rows.push(FeatureRow {
                numeric: vec![19.99, 0.0, rating, 3.0, 30.0, 0.0],
                categorical: Vec::new(),
                boolean: vec![false],
            });
            labels.push(on_sale);
        }
        Features {
            frame: FeatureFrame {
                columns: FeatureColumns::standard(),
                rows,
            },
            labels,
        }
    }

    #[test]
    fn learns_direction_of_signal() {
        let outcome = train(&overlapping(40), &TrainOptions::default()).unwrap();
        assert_eq!(outcome.train_rows + outcome.test_rows, 40);
        assert_eq!(outcome.evaluation.total(), outcome.test_rows);

        let query = |rating_pct| SaleQuery {
            price: 19.99,
            rating_pct,
            age_years: 3.0,
            is_new_low: false,
        };
        let low = outcome.model.predict_query(&query(50.0)).unwrap();
        let high = outcome.model.predict_query(&query(100.0)).unwrap();
        assert!(low > 0.5, "low rating gave {low}");
        assert!(high < 0.5, "high rating gave {high}");
    }

    #[test]
    fn empty_features_are_rejected() {
        let empty = overlapping(0);
        let err = train(&empty, &TrainOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)), "got {err}");
    }

    #[test]
    fn oversampling_reaches_parity() {
        let mut set = overlapping(40);
        for l in set.labels.iter_mut().skip(10) {
            *l = false;
        }
        let balanced = oversample(&set, 42);
        assert_eq!(balanced.positives() * 2, balanced.len());
        assert_eq!(balanced.frame.len(), balanced.len());
    }
}
