//! Evaluation metrics for the binary classifier.
//!
//! Mirrors the usual confusion-matrix / classification-report pair: per-class
//! precision, recall, F1 and support, plus accuracy and macro / weighted
//! averages. Undefined ratios (no predicted or no true members) count as 0.

use crate::model::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

fn check_labels(y_true: &[usize], y_pred: &[usize]) -> Result<(), ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeMismatch {
            rows: y_true.len(),
            labels: y_pred.len(),
        });
    }
    if let Some(&label) = y_true.iter().chain(y_pred).find(|&&label| label > 1) {
        return Err(ModelError::InvalidLabel(label));
    }
    Ok(())
}

/// Fraction of matching labels; 0 for empty input.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> Result<f64, ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeMismatch {
            rows: y_true.len(),
            labels: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Ok(0.0);
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

/// Number of samples per label, in label order.
pub fn class_counts(y: &[usize]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in y {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// 2×2 confusion matrix indexed `[true][predicted]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn new(y_true: &[usize], y_pred: &[usize]) -> Result<Self, ModelError> {
        check_labels(y_true, y_pred)?;
        let mut counts = [[0; 2]; 2];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            counts[t][p] += 1;
        }
        Ok(Self { counts })
    }

    pub fn true_negatives(&self) -> usize {
        self.counts[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.counts[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.counts[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.counts[1][1]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10}{:>10}{:>10}", "", "pred 0", "pred 1")?;
        for (label, row) in self.counts.iter().enumerate() {
            writeln!(f, "{:>10}{:>10}{:>10}", format!("true {label}"), row[0], row[1])?;
        }
        Ok(())
    }
}

/// Precision, recall and F1 for one class (or one average).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassMetrics {
    fn for_class(cm: &ConfusionMatrix, class: usize) -> Self {
        let other = 1 - class;
        let tp = cm.counts[class][class];
        let predicted = tp + cm.counts[other][class];
        let support = tp + cm.counts[class][other];

        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support,
        }
    }

    fn average(classes: &[ClassMetrics; 2], weights: [f64; 2], support: usize) -> Self {
        let norm: f64 = weights.iter().sum();
        let mean = |field: fn(&ClassMetrics) -> f64| {
            if norm == 0.0 {
                return 0.0;
            }
            classes
                .iter()
                .zip(weights)
                .map(|(m, w)| w * field(m))
                .sum::<f64>()
                / norm
        };
        Self {
            precision: mean(|m| m.precision),
            recall: mean(|m| m.recall),
            f1: mean(|m| m.f1),
            support,
        }
    }
}

/// Per-class metrics plus accuracy and averages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn new(y_true: &[usize], y_pred: &[usize]) -> Result<Self, ModelError> {
        let cm = ConfusionMatrix::new(y_true, y_pred)?;
        let classes = [ClassMetrics::for_class(&cm, 0), ClassMetrics::for_class(&cm, 1)];
        let total = cm.total();

        Ok(Self {
            classes,
            accuracy: ratio(cm.true_negatives() + cm.true_positives(), total),
            macro_avg: ClassMetrics::average(&classes, [1.0, 1.0], total),
            weighted_avg: ClassMetrics::average(
                &classes,
                [classes[0].support as f64, classes[1].support as f64],
                total,
            ),
            confusion_matrix: cm,
        })
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>12}{:>10.2}{:>10.2}{:>10.2}{:>10}",
        name, m.precision, m.recall, m.f1, m.support
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12}{:>10}{:>10}{:>10}{:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, metrics) in self.classes.iter().enumerate() {
            write_row(f, &label.to_string(), metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12}{:>10}{:>10}{:>10.2}{:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion_matrix.total()
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const Y_TRUE: [usize; 8] = [0, 0, 0, 0, 0, 1, 1, 1];
    const Y_PRED: [usize; 8] = [0, 0, 0, 1, 0, 1, 0, 1];

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&Y_TRUE, &Y_PRED).unwrap(), 0.75);
        assert_eq!(accuracy(&[], &[]).unwrap(), 0.0);
        assert!(accuracy(&[0, 1], &[0]).is_err());
    }

    #[test]
    fn test_class_counts() {
        let counts = class_counts(&Y_TRUE);
        assert_eq!(counts.get(&0), Some(&5));
        assert_eq!(counts.get(&1), Some(&3));
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = ConfusionMatrix::new(&Y_TRUE, &Y_PRED).unwrap();
        assert_eq!(cm.counts, [[4, 1], [1, 2]]);
        assert_eq!(cm.true_positives(), 2);
        assert_eq!(cm.false_negatives(), 1);
        assert_eq!(cm.total(), 8);
        assert!(matches!(
            ConfusionMatrix::new(&[0, 2], &[0, 1]),
            Err(ModelError::InvalidLabel(2))
        ));
    }

    #[test]
    fn test_classification_report() {
        let report = ClassificationReport::new(&Y_TRUE, &Y_PRED).unwrap();

        assert_abs_diff_eq!(report.classes[0].precision, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(report.classes[0].recall, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(report.classes[1].precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.classes[1].recall, 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(report.classes[1].support, 3);
        assert_eq!(report.accuracy, 0.75);

        assert_abs_diff_eq!(
            report.macro_avg.f1,
            (0.8 + 2.0 / 3.0) / 2.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            report.weighted_avg.recall,
            (5.0 * 0.8 + 3.0 * 2.0 / 3.0) / 8.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_report_without_positive_predictions() {
        let report = ClassificationReport::new(&[0, 0, 1], &[0, 0, 0]).unwrap();
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
    }

    #[test]
    fn test_report_display() {
        let text = ClassificationReport::new(&Y_TRUE, &Y_PRED)
            .unwrap()
            .to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("0.75"));
    }
}
