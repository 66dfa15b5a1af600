// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch, and
// the final evaluation of the best model next to it.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean BCE over the training batches
//   - val_loss:   BCE over the whole validation partition
//   - val_auc:    validation AUC (empty when single-class)
//
// Output files (checkpoint dir):
//   metrics.csv      — one row per epoch
//   evaluation.json  — AUC, log-loss, confusion matrix, report
//   roc_curve.csv    — threshold,fpr,tpr
//
// Example metrics.csv:
//   epoch,train_loss,val_loss,val_auc
//   1,0.512300,0.448100,0.871200
//   2,0.401200,0.392000,0.905500
//
// How to read the metrics:
//   - If val_loss rises while train_loss falls → overfitting;
//     early stopping will end the run after `patience` epochs
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::evaluator::EvaluationReport;

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean binary cross-entropy over all training batches
    pub train_loss: f64,

    /// Binary cross-entropy on the validation partition.
    /// This is what early stopping watches.
    pub val_loss: f64,

    /// Validation AUC; None when the validation labels are all
    /// one class
    pub val_auc: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, val_auc: Option<f64>) -> Self {
        Self { epoch, train_loss, val_loss, val_auc }
    }

    /// True if this epoch's val_loss is strictly below `best_val_loss`
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh metrics.csv in `dir` (any previous run's file
    /// is replaced).
    pub fn create(dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| PipelineError::write(dir, e))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path).map_err(|e| PipelineError::write(&csv_path, e))?;
        writeln!(f, "epoch,train_loss,val_loss,val_auc")
            .map_err(|e| PipelineError::write(&csv_path, e))?;

        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> PipelineResult<()> {
        let write_err = |e| PipelineError::write(&self.csv_path, e);
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(write_err)?;

        let auc = m.val_auc.map(|a| format!("{a:.6}")).unwrap_or_default();
        writeln!(f, "{},{:.6},{:.6},{}", m.epoch, m.train_loss, m.val_loss, auc)
            .map_err(write_err)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

/// Write evaluation.json and roc_curve.csv into `dir`.
pub fn write_evaluation(dir: impl AsRef<Path>, report: &EvaluationReport) -> PipelineResult<()> {
    let dir = dir.as_ref();

    let json_path = dir.join("evaluation.json");
    let json = serde_json::to_string_pretty(report).map_err(|e| {
        PipelineError::write(&json_path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    fs::write(&json_path, json).map_err(|e| PipelineError::write(&json_path, e))?;

    let roc_path = dir.join("roc_curve.csv");
    let mut body = String::from("threshold,fpr,tpr\n");
    for p in &report.roc {
        body.push_str(&format!("{},{:.6},{:.6}\n", p.threshold, p.fpr, p.tpr));
    }
    fs::write(&roc_path, body).map_err(|e| PipelineError::write(&roc_path, e))?;

    tracing::debug!("Wrote evaluation artifacts to '{}'", dir.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Label;
    use crate::ml::evaluator::evaluate;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.5, 0.3, Some(0.9));
        assert!(m.is_improvement(0.4));
        assert!(!m.is_improvement(0.3));
        assert!(!EpochMetrics::new(3, 0.5, f64::NAN, None).is_improvement(0.4));
    }

    #[test]
    fn test_rows_appended_after_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.4, Some(0.75))).unwrap();
        logger.log(&EpochMetrics::new(2, 0.4, 0.45, None)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "epoch,train_loss,val_loss,val_auc",
            "1,0.500000,0.400000,0.750000",
            "2,0.400000,0.450000,",
        ]);
    }

    #[test]
    fn test_evaluation_artifacts() {
        let dir    = tempfile::tempdir().unwrap();
        let labels = vec![Label::Negative, Label::Positive, Label::Positive];
        let report = evaluate(&labels, &[0.2, 0.6, 0.9], 0.5).unwrap();

        write_evaluation(dir.path(), &report).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("evaluation.json")).unwrap()).unwrap();
        assert_eq!(json["auc"], 1.0);

        let roc = fs::read_to_string(dir.path().join("roc_curve.csv")).unwrap();
        assert_eq!(roc.lines().count(), 1 + report.roc.len());
    }
}
