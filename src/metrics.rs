//! Evaluation of a binary classifier on held-out rows.

use std::fmt;

use smartcore::metrics::accuracy;

/// Rows are actual class, columns predicted class (0 = low, 1 = high).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[i32], y_pred: &[i32]) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&actual, &predicted) in y_true.iter().zip(y_pred) {
            match (actual == 1, predicted == 1) {
                (false, false) => cm.true_negative += 1,
                (false, true) => cm.false_positive += 1,
                (true, false) => cm.false_negative += 1,
                (true, true) => cm.true_positive += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Precision, recall, F1 and support for one class.
    pub fn class_scores(&self, class: i32) -> ClassScores {
        let (tp, fp, fn_) = if class == 1 {
            (self.true_positive, self.false_positive, self.false_negative)
        } else {
            (self.true_negative, self.false_negative, self.false_positive)
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassScores {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class scores plus accuracy and averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub confusion: ConfusionMatrix,
    pub low: ClassScores,
    pub high: ClassScores,
    pub accuracy: f64,
}

impl ClassificationReport {
    pub fn new(y_true: &[i32], y_pred: &[i32]) -> Self {
        let confusion = ConfusionMatrix::from_labels(y_true, y_pred);
        Self {
            low: confusion.class_scores(0),
            high: confusion.class_scores(1),
            accuracy: if y_true.is_empty() {
                0.0
            } else {
                accuracy(&y_true.to_vec(), &y_pred.to_vec())
            },
            confusion,
        }
    }

    pub fn macro_avg(&self) -> ClassScores {
        ClassScores {
            precision: (self.low.precision + self.high.precision) / 2.0,
            recall: (self.low.recall + self.high.recall) / 2.0,
            f1: (self.low.f1 + self.high.f1) / 2.0,
            support: self.low.support + self.high.support,
        }
    }

    pub fn weighted_avg(&self) -> ClassScores {
        let total = (self.low.support + self.high.support) as f64;
        if total == 0.0 {
            return ClassScores {
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
                support: 0,
            };
        }
        let wl = self.low.support as f64 / total;
        let wh = self.high.support as f64 / total;
        ClassScores {
            precision: self.low.precision * wl + self.high.precision * wh,
            recall: self.low.recall * wl + self.high.recall * wh,
            f1: self.low.f1 * wl + self.high.f1 * wh,
            support: self.low.support + self.high.support,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cm = &self.confusion;
        writeln!(f, "Confusion Matrix:")?;
        writeln!(f, "[[{:>5} {:>5}]", cm.true_negative, cm.false_positive)?;
        writeln!(f, " [{:>5} {:>5}]]", cm.false_negative, cm.true_positive)?;
        writeln!(f)?;
        writeln!(f, "Classification Report:")?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        write_row(f, "Low Risk", &self.low)?;
        write_row(f, "High Risk", &self.high)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            cm.total()
        )?;
        write_row(f, "macro avg", &self.macro_avg())?;
        write_row(f, "weighted avg", &self.weighted_avg())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, s: &ClassScores) -> fmt::Result {
    writeln!(
        f,
        "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, s.precision, s.recall, s.f1, s.support
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_counts() {
        let y_true = [0, 0, 0, 1, 1, 1, 1];
        let y_pred = [0, 1, 0, 1, 1, 0, 1];
        let cm = ConfusionMatrix::from_labels(&y_true, &y_pred);
        assert_eq!(cm.true_negative, 2);
        assert_eq!(cm.false_positive, 1);
        assert_eq!(cm.false_negative, 1);
        assert_eq!(cm.true_positive, 3);
        assert_eq!(cm.total(), 7);
    }

    #[test]
    fn test_report_accuracy() {
        let report = ClassificationReport::new(&[0, 0, 0, 1, 1, 1, 1], &[0, 1, 0, 1, 1, 0, 1]);
        assert!((report.accuracy - 5.0 / 7.0).abs() < 1e-12);

        let empty = ClassificationReport::new(&[], &[]);
        assert_eq!(empty.accuracy, 0.0);
    }

    #[test]
    fn test_class_scores() {
        let y_true = [0, 0, 0, 1, 1, 1, 1];
        let y_pred = [0, 1, 0, 1, 1, 0, 1];
        let report = ClassificationReport::new(&y_true, &y_pred);

        assert!((report.high.precision - 0.75).abs() < 1e-12);
        assert!((report.high.recall - 0.75).abs() < 1e-12);
        assert_eq!(report.high.support, 4);
        assert!((report.low.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.low.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.low.support, 3);
        assert_eq!(report.macro_avg().support, 7);
    }

    #[test]
    fn test_no_positive_predictions() {
        let report = ClassificationReport::new(&[1, 1], &[0, 0]);
        assert_eq!(report.high.precision, 0.0);
        assert_eq!(report.high.f1, 0.0);
        assert_eq!(report.accuracy, 0.0);
    }

    #[test]
    fn test_report_renders() {
        let report = ClassificationReport::new(&[0, 1, 1], &[0, 1, 0]);
        let text = report.to_string();
        assert!(text.contains("Confusion Matrix:"));
        assert!(text.contains("High Risk"));
        assert!(text.contains("weighted avg"));
    }
}
