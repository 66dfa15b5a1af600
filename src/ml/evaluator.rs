// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a set of validation predictions against the truth.
//
//   roc_auc       — rank-based (Mann–Whitney U) AUC, ties get
//                   their average rank
//   roc_curve     — (threshold, FPR, TPR) at every distinct
//                   score, highest threshold first
//   log_loss      — binary cross-entropy, the validation loss
//                   used for early stopping
//   confusion     — TN / FP / FN / TP at a probability cut-off
//   report        — per-class precision, recall, F1, support
//
// AUC = P(score of random positive > score of random negative)
//     = (R₊ − n₊(n₊+1)/2) / (n₊ · n₋)
// where R₊ is the sum of the positives' ranks (1-based,
// ascending score). Only the ORDER of the scores matters, so any
// strictly increasing transform of the scores gives the same AUC.
//
// With only one class present n₊·n₋ = 0 and AUC is undefined:
// that is a DegenerateInput error, not NaN. A NaN or infinite
// score is rejected up front as NonFiniteScore.
//
// Pure Rust with no Burn types, so it runs in unit tests
// without a device.
//
// Reference: Fawcett (2006) An introduction to ROC analysis
//            Hanley & McNeil (1982)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::Label;

/// Probabilities are clamped into [EPSILON, 1 − EPSILON] before
/// taking logarithms.
pub const EPSILON: f64 = 1e-7;

/// Default cut-off for turning a probability into a class.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

fn check_inputs(labels: &[Label], scores: &[f32]) -> PipelineResult<()> {
    if labels.len() != scores.len() {
        return Err(PipelineError::LengthMismatch {
            labels:      labels.len(),
            predictions: scores.len(),
        });
    }
    if labels.is_empty() {
        return Err(PipelineError::DegenerateInput("no samples to evaluate".into()));
    }
    if let Some((index, &value)) = scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
        return Err(PipelineError::NonFiniteScore { index, value });
    }
    Ok(())
}

/// Sort keys for ranking. -0.0 + 0.0 is +0.0, so signed zeros tie
/// under total_cmp.
fn rank_keys(scores: &[f32]) -> Vec<f32> {
    scores.iter().map(|&s| s + 0.0).collect()
}

/// (positives, negatives), erroring when either is zero.
fn class_counts(labels: &[Label]) -> PipelineResult<(usize, usize)> {
    let pos = labels.iter().filter(|l| l.is_positive()).count();
    let neg = labels.len() - pos;
    if pos == 0 || neg == 0 {
        return Err(PipelineError::DegenerateInput(format!(
            "AUC needs both classes, got {pos} positive and {neg} negative labels"
        )));
    }
    Ok((pos, neg))
}

// ─── AUC ──────────────────────────────────────────────────────────────────────
pub fn roc_auc(labels: &[Label], scores: &[f32]) -> PipelineResult<f64> {
    check_inputs(labels, scores)?;
    let (n_pos, n_neg) = class_counts(labels)?;
    let keys = rank_keys(scores);

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));

    let mut pos_rank_sum = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        // [i, j] is one run of tied scores
        let mut j = i;
        while j + 1 < order.len() && keys[order[j + 1]].total_cmp(&keys[order[i]]).is_eq() {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        let tied_pos = order[i..=j].iter().filter(|&&k| labels[k].is_positive()).count();
        pos_rank_sum += avg_rank * tied_pos as f64;
        i = j + 1;
    }

    let (p, n) = (n_pos as f64, n_neg as f64);
    Ok((pos_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

// ─── ROC curve ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub threshold: f32,
    pub fpr:       f64,
    pub tpr:       f64,
}

/// One point per distinct score, thresholds descending. A sample
/// counts as positive at threshold t when its score ≥ t, so the
/// last point is always (1, 1).
pub fn roc_curve(labels: &[Label], scores: &[f32]) -> PipelineResult<Vec<RocPoint>> {
    check_inputs(labels, scores)?;
    let (n_pos, n_neg) = class_counts(labels)?;
    let keys = rank_keys(scores);

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[b].total_cmp(&keys[a]));

    let mut points = Vec::new();
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = keys[order[i]];
        while i < order.len() && keys[order[i]].total_cmp(&threshold).is_eq() {
            if labels[order[i]].is_positive() {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            threshold,
            fpr: fp as f64 / n_neg as f64,
            tpr: tp as f64 / n_pos as f64,
        });
    }
    Ok(points)
}

// ─── Log loss ─────────────────────────────────────────────────────────────────
/// Mean binary cross-entropy of `probabilities` against `labels`.
pub fn log_loss(labels: &[Label], probabilities: &[f32]) -> PipelineResult<f64> {
    check_inputs(labels, probabilities)?;
    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(l, &p)| {
            let p = (p as f64).clamp(EPSILON, 1.0 - EPSILON);
            if l.is_positive() { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    Ok(total / labels.len() as f64)
}

// ─── Confusion matrix ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative:  usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive:  usize,
}

impl ConfusionMatrix {
    /// Predicted positive when probability ≥ `threshold`.
    pub fn at_threshold(
        labels:        &[Label],
        probabilities: &[f32],
        threshold:     f32,
    ) -> PipelineResult<Self> {
        check_inputs(labels, probabilities)?;
        let mut m = Self::default();
        for (l, &p) in labels.iter().zip(probabilities) {
            match (l.is_positive(), p >= threshold) {
                (false, false) => m.true_negative  += 1,
                (false, true)  => m.false_positive += 1,
                (true,  false) => m.false_negative += 1,
                (true,  true)  => m.true_positive  += 1,
            }
        }
        Ok(m)
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negative + self.true_positive, self.total())
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            pred 0    pred 1")?;
        writeln!(f, "true 0  {:>10}{:>10}", self.true_negative, self.false_positive)?;
        write!(f,   "true 1  {:>10}{:>10}", self.false_negative, self.true_positive)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

// ─── Classification report ────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

impl ClassMetrics {
    fn new(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall    = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self { precision, recall, f1, support: tp + fn_ }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub negative:     ClassMetrics,
    pub positive:     ClassMetrics,
    pub accuracy:     f64,
    pub macro_avg:    ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(m: &ConfusionMatrix) -> Self {
        let negative = ClassMetrics::new(m.true_negative, m.false_negative, m.false_positive);
        let positive = ClassMetrics::new(m.true_positive, m.false_positive, m.false_negative);
        let total    = m.total();

        let macro_avg = ClassMetrics {
            precision: (negative.precision + positive.precision) / 2.0,
            recall:    (negative.recall + positive.recall) / 2.0,
            f1:        (negative.f1 + positive.f1) / 2.0,
            support:   total,
        };

        let w = |neg: f64, pos: f64| {
            if total == 0 {
                0.0
            } else {
                (neg * negative.support as f64 + pos * positive.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: w(negative.precision, positive.precision),
            recall:    w(negative.recall, positive.recall),
            f1:        w(negative.f1, positive.f1),
            support:   total,
        };

        Self { negative, positive, accuracy: m.accuracy(), macro_avg, weighted_avg }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, c: &ClassMetrics| {
            writeln!(
                f,
                "{:>12}{:>11.2}{:>10.2}{:>10.2}{:>10}",
                name, c.precision, c.recall, c.f1, c.support
            )
        };
        writeln!(f, "{:>12}{:>11}{:>10}{:>10}{:>10}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        row(f, "0", &self.negative)?;
        row(f, "1", &self.positive)?;
        writeln!(f)?;
        writeln!(f, "{:>12}{:>11}{:>10}{:>10.2}{:>10}", "accuracy", "", "", self.accuracy, self.macro_avg.support)?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

// ─── Full evaluation ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples:   usize,
    pub auc:       f64,
    pub log_loss:  f64,
    pub threshold: f32,
    pub confusion: ConfusionMatrix,
    pub report:    ClassificationReport,
    pub roc:       Vec<RocPoint>,
}

/// AUC, ROC, log-loss, confusion matrix and report in one pass.
pub fn evaluate(
    labels:        &[Label],
    probabilities: &[f32],
    threshold:     f32,
) -> PipelineResult<EvaluationReport> {
    let auc       = roc_auc(labels, probabilities)?;
    let roc       = roc_curve(labels, probabilities)?;
    let log_loss  = log_loss(labels, probabilities)?;
    let confusion = ConfusionMatrix::at_threshold(labels, probabilities, threshold)?;
    let report    = ClassificationReport::from_confusion(&confusion);

    Ok(EvaluationReport {
        samples: labels.len(),
        auc,
        log_loss,
        threshold,
        confusion,
        report,
        roc,
    })
}
