//! Per-class classification metrics

use serde::{Deserialize, Serialize};

/// Precision / recall / F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// True instances of the class
    pub support: usize,
}

/// Binary classification report: class 0, class 1, then the averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion: [[usize; 2]; 2],
}

impl ClassificationReport {
    /// Build the report from 0/1 labels; a zero denominator yields 0.0
    pub fn compute(y_true: &[u8], y_pred: &[u8]) -> Self {
        let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);
        let total = y_true.len();

        // class 0 treats "negative" as the positive label
        let classes = vec![
            class_metrics("0", tn, fn_, fp),
            class_metrics("1", tp, fp, fn_),
        ];

        let accuracy = ratio(tp + tn, total);
        let mean = |f: fn(&ClassMetrics) -> f64| classes.iter().map(f).sum::<f64>() / classes.len() as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };

        let macro_avg = ClassMetrics {
            class: "macro avg".to_string(),
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1_score: mean(|c| c.f1_score),
            support: total,
        };
        let weighted_avg = ClassMetrics {
            class: "weighted avg".to_string(),
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
            confusion: [[tn, fp], [fn_, tp]],
        }
    }

    /// Class rows followed by the macro and weighted averages
    pub fn rows(&self) -> impl Iterator<Item = &ClassMetrics> {
        self.classes
            .iter()
            .chain(std::iter::once(&self.macro_avg))
            .chain(std::iter::once(&self.weighted_avg))
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn class_metrics(class: &str, hits: usize, false_alarms: usize, misses: usize) -> ClassMetrics {
    let precision = ratio(hits, hits + false_alarms);
    let recall = ratio(hits, hits + misses);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        class: class.to_string(),
        precision,
        recall,
        f1_score,
        support: hits + misses,
    }
}

fn confusion_counts(y_true: &[u8], y_pred: &[u8]) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == 1, p == 1) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}
