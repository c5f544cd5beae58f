use std::fmt;

/// Precision / recall / F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn new(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Held-out performance of the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub not_on_sale: ClassMetrics,
    pub on_sale: ClassMetrics,
    pub accuracy: f64,
    /// `[[tn, fp], [fn, tp]]`: rows are the truth, columns the prediction.
    pub confusion: [[usize; 2]; 2],
}

impl Evaluation {
    pub fn from_predictions(truth: &[bool], predicted: &[bool]) -> Self {
        let mut confusion = [[0usize; 2]; 2];
        for (&t, &p) in truth.iter().zip(predicted) {
            confusion[t as usize][p as usize] += 1;
        }
        let [[tn, fp], [fn_, tp]] = confusion;
        Evaluation {
            not_on_sale: ClassMetrics::new(tn, fn_, fp),
            on_sale: ClassMetrics::new(tp, fp, fn_),
            accuracy: ratio(tn + tp, tn + fp + fn_ + tp),
            confusion,
        }
    }

    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (label, m) in [("not on sale", &self.not_on_sale), ("on sale", &self.on_sale)] {
            writeln!(
                f,
                "{label:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f, "{:>12} {:>32.2} {:>10}", "accuracy", self.accuracy, self.total())?;
        let [[tn, fp], [fn_, tp]] = self.confusion;
        writeln!(f)?;
        writeln!(f, "confusion matrix (rows = truth):")?;
        writeln!(f, "  [[{tn:>5} {fp:>5}]")?;
        write!(f, "   [{fn_:>5} {tp:>5}]]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_class_metrics() {
        let truth = [true, true, true, false, false, false, false, false];
        let pred = [true, true, false, true, false, false, false, false];
        let eval = Evaluation::from_predictions(&truth, &pred);

        assert_eq!(eval.confusion, [[4, 1], [1, 2]]);
        assert_eq!(eval.accuracy, 0.75);
        assert!((eval.on_sale.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((eval.on_sale.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(eval.on_sale.support, 3);
        assert_eq!(eval.not_on_sale.precision, 0.8);
        assert_eq!(eval.not_on_sale.support, 5);
    }

    #[test]
    fn no_positive_predictions_give_zero_precision() {
        let eval = Evaluation::from_predictions(&[true, false], &[false, false]);
        assert_eq!(eval.on_sale.precision, 0.0);
        assert_eq!(eval.on_sale.f1, 0.0);
        assert!(eval.to_string().contains("accuracy"));
    }
}
